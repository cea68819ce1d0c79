use thiserror::Error;

use crate::report::RowId;

/// Failures while turning an uploaded file into report rows
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported file type: {0} (expected .xlsx, .xls or .csv)")]
    UnsupportedType(String),

    #[error("The uploaded file contains no rows")]
    Empty,

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read workbook: {0}")]
    Workbook(String),

    #[error("Row {row}: invalid id {value:?}")]
    InvalidId { row: usize, value: String },

    #[error("Duplicate row id {0}")]
    DuplicateId(RowId),
}

/// Failures of the remote status-update call
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Deserialize error: {0}")]
    Deserialize(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username and password cannot be empty")]
    MissingCredentials,

    #[error("Failed to persist token: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Corrupt token file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate row id {0}")]
    DuplicateId(RowId),
}

/// Everything a web handler can fail with
#[cfg(feature = "web")]
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),

    #[error("Bad upload: {0}")]
    Upload(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Template error: {0}")]
    Render(#[from] handlebars::RenderError),
}

#[cfg(feature = "web")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            AppError::Ingest(_) | AppError::Store(_) | AppError::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::UnknownWorkflow(_) => StatusCode::NOT_FOUND,
            AppError::Export(_) | AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log::error!("{}", self);
        }
        (status, self.to_string()).into_response()
    }
}
