//! Application error types and handling

use thiserror::Error;

use crate::files::UploadError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Upload rejected: {}", .0.join("; "))]
    UploadRejected(Vec<String>),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Messages suitable for showing to whoever supplied the input.
    pub fn messages(&self) -> Vec<String> {
        match self {
            AppError::UploadRejected(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::BadRequest(_)
                | AppError::Validation(_)
                | AppError::Authentication(_)
                | AppError::UploadRejected(_)
                | AppError::Upload(_)
        )
    }
}
