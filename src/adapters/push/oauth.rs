use crate::adapters::push::PushError;
use crate::error::StartupError;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tokio::time::Instant;

pub const FIREBASE_MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const ASSERTION_LIFETIME_SECS: u64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(60);
// Pre-encoded for the form body.
const JWT_BEARER_GRANT_TYPE: &str = "urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Google service account credentials, as downloaded from the Firebase console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: Option<String>,
    pub project_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Loads a service account key from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a service account key.
    pub fn from_file(path: &Path) -> Result<Self, StartupError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| StartupError::CredentialsFile { path: path.to_path_buf(), source })?;
        Self::from_json(&raw)
    }

    /// Parses a service account key from its JSON representation.
    ///
    /// # Errors
    /// Returns `StartupError::Credentials` if required fields are missing or of the wrong kind.
    pub fn from_json(raw: &str) -> Result<Self, StartupError> {
        let key: Self = serde_json::from_str(raw).map_err(|e| StartupError::Credentials(e.to_string()))?;
        match key.key_type.as_deref() {
            None | Some("service_account") => {}
            Some(kind) => return Err(StartupError::Credentials(format!("unsupported credentials type: {kind}"))),
        }
        if key.project_id.is_empty() {
            return Err(StartupError::Credentials("project_id is empty".into()));
        }
        Ok(key)
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

impl CachedToken {
    fn new(value: String, lifetime: Duration) -> Self {
        Self { value, refresh_at: Instant::now() + refresh_after(lifetime) }
    }

    fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_at
    }
}

/// How long a token with the given lifetime is reused before refreshing.
/// Short-lived tokens keep half their lifetime instead of the full margin.
fn refresh_after(lifetime: Duration) -> Duration {
    lifetime.saturating_sub(REFRESH_MARGIN.min(lifetime / 2))
}

/// Exchanges signed service account assertions for OAuth2 access tokens and caches them.
pub struct TokenSource {
    http: reqwest::Client,
    client_email: String,
    token_uri: String,
    encoding_key: EncodingKey,
    cached: RwLock<Option<CachedToken>>,
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSource")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl TokenSource {
    /// Creates a token source for the given key.
    ///
    /// # Errors
    /// Returns `StartupError::Credentials` if the private key is not a valid RSA PEM key.
    pub fn new(key: &ServiceAccountKey, http: reqwest::Client) -> Result<Self, StartupError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| StartupError::Credentials(format!("invalid private key: {e}")))?;

        Ok(Self {
            http,
            client_email: key.client_email.clone(),
            token_uri: key.token_uri.clone(),
            encoding_key,
            cached: RwLock::new(None),
        })
    }

    /// Returns a valid access token, fetching a new one if the cached token is about to expire.
    ///
    /// # Errors
    /// Returns `PushError::Auth` if the token endpoint refuses the assertion.
    pub async fn access_token(&self) -> Result<String, PushError> {
        if let Some(token) = self.cached.read().await.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let mut cached = self.cached.write().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let token = self.fetch().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    fn sign_assertion(&self) -> Result<String, PushError> {
        let iat = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|e| PushError::Auth(e.to_string()))?.as_secs();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: FIREBASE_MESSAGING_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| PushError::Auth(format!("failed to sign assertion: {e}")))
    }

    #[tracing::instrument(level = "debug", skip(self), fields(token_uri = %self.token_uri))]
    async fn fetch(&self) -> Result<CachedToken, PushError> {
        let assertion = self.sign_assertion()?;
        let response = self
            .http
            .post(&self.token_uri)
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(format!("grant_type={JWT_BEARER_GRANT_TYPE}&assertion={assertion}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS));
        tracing::debug!(expires_in_secs = lifetime.as_secs(), "Fetched FCM access token");

        Ok(CachedToken::new(token.access_token, lifetime))
    }
}
