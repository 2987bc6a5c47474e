/// Errors surfaced by sources, sinks and the pipelines driving them.
///
/// Only `Csv` and `Io` are allowed to end a run; every other variant is
/// logged, recorded in the missing-unit log and skipped.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Whether this error comes from the local output files rather than from
    /// a single unit of work.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Csv(_) | AppError::Io(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalServiceError(format!("request failed: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(format!("JSON encoding error: {}", err))
    }
}
