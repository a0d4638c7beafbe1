use crate::adapters::push::oauth::{ServiceAccountKey, TokenSource};
use crate::adapters::push::{PushError, PushProvider};
use crate::config::FcmConfig;
use crate::domain::push::ProviderMessage;
use crate::error::StartupError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct SendRequest<'a> {
    message: &'a ProviderMessage,
}

#[derive(Deserialize)]
struct SendResponse {
    name: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

/// Push provider backed by the Firebase Cloud Messaging HTTP v1 API.
#[derive(Debug)]
pub struct FcmPushProvider {
    http: reqwest::Client,
    send_url: String,
    tokens: TokenSource,
}

impl FcmPushProvider {
    /// Builds the provider from the configured credentials file.
    ///
    /// # Errors
    /// Returns a `StartupError` if the credentials cannot be loaded or are invalid.
    pub fn from_config(config: &FcmConfig) -> Result<Self, StartupError> {
        let key = ServiceAccountKey::from_file(&config.credentials_file)?;
        Self::new(&key, &config.api_url, Duration::from_secs(config.timeout_secs))
    }

    /// # Errors
    /// Returns a `StartupError` if the private key is invalid or the HTTP client cannot be built.
    pub fn new(key: &ServiceAccountKey, api_url: &str, timeout: Duration) -> Result<Self, StartupError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let tokens = TokenSource::new(key, http.clone())?;
        let send_url = format!("{}/v1/projects/{}/messages:send", api_url.trim_end_matches('/'), key.project_id);

        Ok(Self { http, send_url, tokens })
    }

    #[must_use]
    pub fn send_url(&self) -> &str {
        &self.send_url
    }
}

fn parse_error(http_status: StatusCode, body: &[u8]) -> PushError {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => PushError::Api {
            http_status: http_status.as_u16(),
            status: envelope.error.status,
            error_code: envelope.error.details.into_iter().find_map(|d| d.error_code),
            message: envelope.error.message,
        },
        Err(_) => PushError::Api {
            http_status: http_status.as_u16(),
            status: None,
            error_code: None,
            message: format!("unexpected response from FCM: HTTP {http_status}: {}", String::from_utf8_lossy(body)),
        },
    }
}

#[async_trait]
impl PushProvider for FcmPushProvider {
    async fn send(&self, message: &ProviderMessage) -> Result<String, PushError> {
        let access_token = self.tokens.access_token().await?;
        let response =
            self.http.post(&self.send_url).bearer_auth(access_token).json(&SendRequest { message }).send().await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(parse_error(status, &body));
        }

        let sent: SendResponse = serde_json::from_slice(&body).map_err(|e| PushError::Other(e.into()))?;
        Ok(sent.name)
    }
}
