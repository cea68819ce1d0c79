#![cfg(feature = "web")]

use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

use crate::loader::{ACCEPTED_EXTENSIONS, SheetRecord};
use crate::report::{ReportRow, RowStatus, Summary, UploadInfo};
use crate::workflow::Workflow;

/// Sidebar entry
#[derive(Debug, Serialize)]
pub struct NavLink {
    pub slug: &'static str,
    pub title: &'static str,
    pub active: bool,
}

pub fn nav(active: Option<Workflow>) -> Vec<NavLink> {
    Workflow::ALL
        .into_iter()
        .map(|workflow| NavLink {
            slug: workflow.slug(),
            title: workflow.title(),
            active: Some(workflow) == active,
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct WorkflowCard {
    pub slug: &'static str,
    pub title: &'static str,
    pub summary: Summary,
}

#[derive(Debug, Serialize)]
struct DashboardView {
    nav: Vec<NavLink>,
    cards: Vec<WorkflowCard>,
}

#[derive(Debug, Serialize)]
struct LoginView<'a> {
    error: Option<&'a str>,
    username: &'a str,
}

/// One line of the status table
#[derive(Debug, Serialize)]
pub struct RowView {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub company: String,
    pub status: RowStatus,
    pub badge: &'static str,
    pub time: String,
}

impl From<ReportRow> for RowView {
    fn from(row: ReportRow) -> Self {
        let badge = match row.status {
            RowStatus::Pending => "pending",
            RowStatus::Processing => "processing",
            RowStatus::Completed => "completed",
            RowStatus::Error => "error",
        };
        RowView {
            id: row.id,
            name: row.name,
            email: row.email,
            company: row.company,
            status: row.status,
            badge,
            time: row.time,
        }
    }
}

#[derive(Debug, Serialize)]
struct SourceView {
    file_name: String,
    uploaded_at: String,
}

/// Everything the workflow page shows
#[derive(Debug, Serialize)]
pub struct WorkflowView {
    slug: &'static str,
    title: &'static str,
    nav: Vec<NavLink>,
    accept: &'static str,
    summary: Summary,
    rows: Vec<RowView>,
    source: Option<SourceView>,
    error: Option<String>,
    refresh: bool,
    records_json: Option<String>,
}

impl WorkflowView {
    /// Build the page from a store snapshot; the summary is derived from the same rows
    pub fn new(
        workflow: Workflow,
        rows: Vec<ReportRow>,
        source: Option<UploadInfo>,
        error: Option<String>,
    ) -> Self {
        let summary = Summary::of(&rows);
        WorkflowView {
            slug: workflow.slug(),
            title: workflow.title(),
            nav: nav(Some(workflow)),
            accept: ACCEPTED_EXTENSIONS,
            summary,
            rows: rows.into_iter().map(RowView::from).collect(),
            source: source.map(|info| SourceView {
                file_name: info.file_name,
                uploaded_at: info.uploaded_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            }),
            error,
            refresh: summary.is_active(),
            records_json: None,
        }
    }

    /// Show the upload's raw parsed rows under the table
    pub fn with_records(mut self, records: &[SheetRecord]) -> Self {
        if !records.is_empty() {
            self.records_json = serde_json::to_string_pretty(records).ok();
        }
        self
    }
}

/// Compiled page templates
pub struct Views {
    registry: Handlebars<'static>,
}

impl Views {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_partial("sidebar", include_str!("./static/sidebar.html"))?;
        registry.register_template_string("login", include_str!("./static/login.html"))?;
        registry.register_template_string("dashboard", include_str!("./static/dashboard.html"))?;
        registry.register_template_string("workflow", include_str!("./static/workflow.html"))?;
        Ok(Views { registry })
    }

    pub fn login(&self, error: Option<&str>, username: &str) -> Result<String, RenderError> {
        self.registry
            .render("login", &LoginView { error, username })
    }

    pub fn dashboard(&self, cards: Vec<WorkflowCard>) -> Result<String, RenderError> {
        self.registry.render(
            "dashboard",
            &DashboardView {
                nav: nav(None),
                cards,
            },
        )
    }

    pub fn workflow(&self, view: &WorkflowView) -> Result<String, RenderError> {
        self.registry.render("workflow", view)
    }
}
