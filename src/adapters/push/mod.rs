use crate::domain::push::ProviderMessage;
use async_trait::async_trait;
use thiserror::Error;

pub mod fcm;
pub mod oauth;

pub use fcm::FcmPushProvider;

#[derive(Error, Debug)]
pub enum PushError {
    /// The provider answered with an error document.
    #[error("{message}")]
    Api {
        http_status: u16,
        status: Option<String>,
        error_code: Option<String>,
        message: String,
    },
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Provider call cancelled")]
    Cancelled,
    #[error("External service error: {0}")]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait PushProvider: Send + Sync + std::fmt::Debug {
    /// Sends a message to the device identified by `message.token`.
    ///
    /// Returns the provider-assigned message id. Dropping the returned future
    /// abandons the in-flight call.
    ///
    /// # Errors
    /// Returns `PushError::Api` when the provider rejects the message, or another
    /// variant when the provider could not be reached.
    async fn send(&self, message: &ProviderMessage) -> Result<String, PushError>;
}
