#![cfg(feature = "web")]

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::auth::AuthGate;
use crate::backend::HttpStatusBackend;
use crate::config::Config;
use crate::downloader;
use crate::error::{AppError, StoreError};
use crate::loader::{self, ParsedSheet, SheetRecord};
use crate::login;
use crate::processor::{ProcessingRun, StatusProcessor};
use crate::report::{ReportRow, Summary, UploadInfo};
use crate::store::StatusStore;
use crate::view::{Views, WorkflowCard, WorkflowView};
use crate::workflow::Workflow;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// State of one workflow page: its rows and the run over the current upload
pub struct WorkflowPage {
    store: Arc<StatusStore>,
    run: Mutex<Option<Arc<ProcessingRun>>>,
}

impl WorkflowPage {
    fn new() -> Self {
        WorkflowPage {
            store: Arc::new(StatusStore::new()),
            run: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    /// Reseed the store with a new upload and arm a fresh processing run for it
    pub fn mount(
        &self,
        sheet: ParsedSheet,
        source: UploadInfo,
    ) -> Result<Arc<ProcessingRun>, StoreError> {
        let generation = self.store.replace_sheet(sheet, Some(source))?;
        let run = Arc::new(ProcessingRun::new(generation));
        *self.run.lock().unwrap_or_else(|p| p.into_inner()) = Some(run.clone());
        Ok(run)
    }

    /// Drop the current upload; a run still going finds its rows gone
    pub fn clear(&self) {
        self.store.clear();
        *self.run.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }

    /// Start the current run in the background unless it already started
    pub fn ensure_running(&self, processor: &Arc<StatusProcessor>) {
        let run = match self.run.lock().unwrap_or_else(|p| p.into_inner()).clone() {
            Some(run) if !run.has_started() => run,
            _ => return,
        };

        let processor = processor.clone();
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Some(report) = run.start(&processor, &store).await {
                log::debug!("Run for generation {} done: {:?}", run.generation(), report);
            }
        });
    }
}

pub struct AppState {
    pub views: Views,
    pub auth: Arc<AuthGate>,
    pub processor: Arc<StatusProcessor>,
    pages: HashMap<Workflow, WorkflowPage>,
}

impl AppState {
    pub fn new(
        auth: AuthGate,
        processor: StatusProcessor,
    ) -> Result<Self, handlebars::TemplateError> {
        Ok(AppState {
            views: Views::new()?,
            auth: Arc::new(auth),
            processor: Arc::new(processor),
            pages: Workflow::ALL
                .into_iter()
                .map(|workflow| (workflow, WorkflowPage::new()))
                .collect(),
        })
    }

    pub fn page(&self, workflow: Workflow) -> &WorkflowPage {
        // Every workflow gets a page in `new`
        &self.pages[&workflow]
    }

    fn render_workflow(&self, workflow: Workflow, error: Option<String>) -> Result<String, AppError> {
        let store = self.page(workflow).store();
        let view = WorkflowView::new(workflow, store.snapshot(), store.source(), error)
            .with_records(&store.records());
        Ok(self.views.workflow(&view)?)
    }
}

#[derive(Serialize)]
struct RowsResponse {
    rows: Vec<ReportRow>,
    summary: Summary,
    source: Option<UploadInfo>,
}

#[derive(Serialize)]
struct RecordsResponse {
    records: Vec<SheetRecord>,
}

/// Build the dashboard router
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/", get(|| async { Redirect::to("/dashboard") }))
        .route("/dashboard", get(serve_dashboard))
        .route("/:workflow", get(serve_workflow))
        .route(
            "/:workflow/upload",
            post(upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/:workflow/clear", post(clear_page))
        .route("/api/:workflow/rows", get(get_rows))
        .route("/api/:workflow/records", get(get_records))
        .route("/api/:workflow/export.csv", get(export_csv))
        .route("/api/:workflow/export.xlsx", get(export_xlsx))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login::require_auth,
        ));

    Router::new()
        .route(
            "/login",
            get(login::serve_login_page).post(login::handle_login),
        )
        .route("/logout", get(login::handle_logout))
        .route("/health", get(|| async { "ok" }))
        .route("/static/style.css", get(serve_stylesheet))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend = match config.request_timeout() {
        Some(timeout) => HttpStatusBackend::with_timeout(&config.backend_url, timeout)?,
        None => HttpStatusBackend::new(&config.backend_url)?,
    };
    let processor = StatusProcessor::new(Arc::new(backend)).with_workers(config.workers);
    let auth = AuthGate::open(&config.token_file);

    let app_state = Arc::new(AppState::new(auth, processor)?);
    let app = router(app_state);

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;
    log::info!(
        "Listening on http://{} (status backend {}, {} worker(s))",
        addr,
        config.backend_url,
        config.workers.max(1)
    );
    axum::serve(listener, app).await?;

    Ok(())
}

fn workflow_from(slug: &str) -> Result<Workflow, AppError> {
    Workflow::from_slug(slug).ok_or_else(|| AppError::UnknownWorkflow(slug.to_string()))
}

async fn serve_stylesheet() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css")],
        include_str!("./static/style.css"),
    )
}

async fn serve_dashboard(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let cards = Workflow::ALL
        .into_iter()
        .map(|workflow| WorkflowCard {
            slug: workflow.slug(),
            title: workflow.title(),
            summary: state.page(workflow).store().summary(),
        })
        .collect();
    Ok(Html(state.views.dashboard(cards)?))
}

async fn serve_workflow(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Html<String>, AppError> {
    let workflow = workflow_from(&slug)?;
    state.page(workflow).ensure_running(&state.processor);
    Ok(Html(state.render_workflow(workflow, None)?))
}

/// Accept a spreadsheet from the picker or a drop, seed the page and start processing
///
/// A file that cannot be ingested leaves the page's rows untouched and
/// comes back as the same page with the error shown under the upload form.
async fn upload_file(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let workflow = workflow_from(&slug)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let mime = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;
        upload = Some((file_name, mime, bytes));
    }
    let (file_name, mime, bytes) =
        upload.ok_or_else(|| AppError::Upload("No file received".to_string()))?;

    let sheet = match loader::ingest_sheet(&file_name, mime.as_deref(), &bytes) {
        Ok(sheet) => sheet,
        Err(e) => {
            log::warn!("Rejected upload {} for {}: {}", file_name, workflow.slug(), e);
            let html = state.render_workflow(workflow, Some(e.to_string()))?;
            return Ok((StatusCode::BAD_REQUEST, Html(html)).into_response());
        }
    };

    log::info!(
        "Loaded {} rows from {} into {}",
        sheet.rows.len(),
        file_name,
        workflow.slug()
    );
    let page = state.page(workflow);
    page.mount(sheet, UploadInfo::now(&file_name))?;
    page.ensure_running(&state.processor);

    Ok(Redirect::to(&format!("/{}", workflow.slug())).into_response())
}

/// "Upload New File": empty the page so the next upload starts clean
async fn clear_page(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Redirect, AppError> {
    let workflow = workflow_from(&slug)?;
    state.page(workflow).clear();
    log::info!("Cleared {}", workflow.slug());
    Ok(Redirect::to(&format!("/{}", workflow.slug())))
}

async fn get_rows(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<RowsResponse>, AppError> {
    let store = state.page(workflow_from(&slug)?).store();
    let rows = store.snapshot();
    Ok(Json(RowsResponse {
        summary: Summary::of(&rows),
        rows,
        source: store.source(),
    }))
}

async fn get_records(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<RecordsResponse>, AppError> {
    let store = state.page(workflow_from(&slug)?).store();
    Ok(Json(RecordsResponse {
        records: store.records(),
    }))
}

async fn export_csv(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    let workflow = workflow_from(&slug)?;
    let rows = state.page(workflow).store().snapshot();
    let csv = downloader::to_csv(&rows).map_err(|e| AppError::Export(e.to_string()))?;
    Ok(attachment(
        "text/csv",
        &format!("{}.csv", workflow.slug()),
        csv.into_bytes(),
    ))
}

async fn export_xlsx(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    let workflow = workflow_from(&slug)?;
    let rows = state.page(workflow).store().snapshot();
    let xlsx = downloader::to_xlsx(&rows).map_err(|e| AppError::Export(e.to_string()))?;
    Ok(attachment(
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        &format!("{}.xlsx", workflow.slug()),
        xlsx,
    ))
}

fn attachment(content_type: &'static str, file_name: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response()
}
