use crate::domain::push::{MAX_CONTENT_LENGTH, MAX_PAYLOAD_LENGTH, PushRequest};
use crate::error::{ValidationError, ValidationResult};

/// Size and shape checks applied to inbound push requests before anything leaves the process.
#[derive(Clone, Copy, Debug)]
pub struct RequestValidator {
    max_content_length: usize,
    max_payload_length: usize,
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self { max_content_length: MAX_CONTENT_LENGTH, max_payload_length: MAX_PAYLOAD_LENGTH }
    }
}

impl RequestValidator {
    #[must_use]
    pub const fn max_content_length(&self) -> usize {
        self.max_content_length
    }

    /// Rejects requests whose declared length is over the limit, without touching the body.
    ///
    /// # Errors
    /// Returns `ValidationError::PayloadTooLarge` if `declared` exceeds the content length limit.
    pub fn check_content_length(&self, declared: Option<u64>) -> ValidationResult<()> {
        let limit = self.max_content_length as u64;
        match declared {
            Some(size) if size > limit => Err(ValidationError::PayloadTooLarge { size: Some(size), limit }),
            _ => Ok(()),
        }
    }

    /// Parses a request body into a push request.
    ///
    /// # Errors
    /// Returns `ValidationError::BadRequest` if the body is not a valid push request.
    pub fn decode(&self, body: &[u8]) -> ValidationResult<PushRequest> {
        serde_json::from_slice(body).map_err(|e| ValidationError::BadRequest(e.to_string()))
    }

    /// Checks that the payload still fits the provider limit once base64-encoded.
    ///
    /// # Errors
    /// Returns `ValidationError::PayloadTooLarge` if the encoded payload is over the limit.
    pub fn check_payload(&self, request: &PushRequest) -> ValidationResult<()> {
        let encoded_len = base64::encoded_len(request.payload.len(), true).unwrap_or(usize::MAX);
        if encoded_len > self.max_payload_length {
            return Err(ValidationError::PayloadTooLarge {
                size: Some(encoded_len as u64),
                limit: self.max_payload_length as u64,
            });
        }
        Ok(())
    }
}
