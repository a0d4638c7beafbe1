use crate::domain::push::DispatchOutcome;
use std::path::PathBuf;
use thiserror::Error;

/// Client-caused rejection of a push request, detected before any provider call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Payload too large (limit {limit} bytes)")]
    PayloadTooLarge { size: Option<u64>, limit: u64 },
}

impl ValidationError {
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::PayloadTooLarge { .. } => "payload_too_large",
        }
    }
}

impl From<ValidationError> for DispatchOutcome {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::BadRequest(_) => Self::BadRequest,
            ValidationError::PayloadTooLarge { .. } => Self::PayloadTooLarge,
        }
    }
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Failed to read credentials file {path}: {source}")]
    CredentialsFile { path: PathBuf, source: std::io::Error },
    #[error("Invalid credentials: {0}")]
    Credentials(String),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Failed to bind {address}: {source}")]
    Bind { address: String, source: std::io::Error },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Listener error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("Server stopped unexpectedly")]
    Stopped,
}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;
