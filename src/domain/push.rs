use base64::Engine;
use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Largest request body accepted on the push endpoint, in bytes.
pub const MAX_CONTENT_LENGTH: usize = 4096;

/// Largest base64-encoded payload forwarded to the provider, in bytes.
pub const MAX_PAYLOAD_LENGTH: usize = 4000;

/// Key of the opaque data entry that carries the encoded payload.
pub const PAYLOAD_DATA_KEY: &str = "payload";

// Padding is required, but non-zero trailing bits in the last symbol are tolerated.
const PAYLOAD_ENGINE: GeneralPurpose =
    GeneralPurpose::new(&alphabet::STANDARD, GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true));

/// A push request as sent by a gomuks client.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PushRequest {
    pub token: String,
    #[serde(default)]
    pub owner: String,
    #[serde(deserialize_with = "deserialize_payload")]
    pub payload: Vec<u8>,
    #[serde(default)]
    pub high_priority: bool,
}

fn deserialize_payload<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded: Option<String> = Option::deserialize(deserializer)?;
    match encoded {
        Some(encoded) => PAYLOAD_ENGINE.decode(encoded).map_err(serde::de::Error::custom),
        None => Ok(Vec::new()),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    High,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl From<bool> for Priority {
    fn from(high_priority: bool) -> Self {
        if high_priority { Self::High } else { Self::Normal }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AndroidConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restricted_package_name: Option<String>,
    pub priority: Priority,
}

/// The message handed to the push provider, in FCM HTTP v1 shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProviderMessage {
    pub token: String,
    pub data: BTreeMap<String, String>,
    pub android: AndroidConfig,
}

impl ProviderMessage {
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        self.data.get(PAYLOAD_DATA_KEY).map(String::as_str)
    }
}

/// Terminal result of handling one push request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Success(String),
    NotFound,
    BadRequest,
    PayloadTooLarge,
    ProviderError,
}

impl DispatchOutcome {
    /// Short label used for logs and metric attributes.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::PayloadTooLarge => "payload_too_large",
            Self::ProviderError => "provider_error",
        }
    }
}
