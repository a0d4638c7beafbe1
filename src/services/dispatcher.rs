use crate::adapters::push::{PushError, PushProvider};
use crate::domain::push::{DispatchOutcome, PushRequest};
use crate::error::ValidationError;
use crate::services::classifier::classify;
use crate::services::translator::MessageTranslator;
use crate::services::validator::RequestValidator;
use axum::body::Body;
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
struct Metrics {
    sent: Counter<u64>,
    errors: Counter<u64>,
    rejected: Counter<u64>,
    invalidated_tokens: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("gomuks-push");
        Self {
            sent: meter
                .u64_counter("push_sent_total")
                .with_description("Total number of push notifications accepted by the provider")
                .build(),
            errors: meter
                .u64_counter("push_errors_total")
                .with_description("Total number of push notifications the provider failed to accept")
                .build(),
            rejected: meter
                .u64_counter("push_rejected_total")
                .with_description("Total number of push requests rejected before reaching the provider")
                .build(),
            invalidated_tokens: meter
                .u64_counter("push_invalidated_tokens_total")
                .with_description("Total number of pushes refused because the recipient token is no longer valid")
                .build(),
        }
    }
}

/// Runs one push request through validation, translation, the provider call and error classification.
#[derive(Debug)]
pub struct PushDispatcher {
    provider: Arc<dyn PushProvider>,
    validator: RequestValidator,
    translator: MessageTranslator,
    metrics: Metrics,
}

impl PushDispatcher {
    #[must_use]
    pub fn new(provider: Arc<dyn PushProvider>, translator: MessageTranslator) -> Self {
        Self { provider, validator: RequestValidator::default(), translator, metrics: Metrics::new() }
    }

    /// Handles a raw request body.
    ///
    /// The declared length is checked before the body is polled, and bodies without one
    /// are never buffered past the content length limit.
    pub async fn handle(&self, content_length: Option<u64>, body: Body, cancel: &CancellationToken) -> DispatchOutcome {
        if let Err(e) = self.validator.check_content_length(content_length) {
            return self.reject(e, None);
        }

        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ValidationError::BadRequest("body read aborted by shutdown".into())),
            res = read_body(body, self.validator.max_content_length()) => res,
        };
        let bytes = match read {
            Ok(bytes) => bytes,
            Err(e) => return self.reject(e, None),
        };

        let request = match self.validator.decode(&bytes) {
            Ok(request) => request,
            Err(e) => return self.reject(e, None),
        };

        if let Err(e) = self.validator.check_payload(&request) {
            return self.reject(e, Some(&request));
        }

        self.dispatch(&request, cancel).await
    }

    /// Sends an already validated request to the provider.
    ///
    /// The provider call is abandoned as soon as `cancel` fires.
    pub async fn dispatch(&self, request: &PushRequest, cancel: &CancellationToken) -> DispatchOutcome {
        let message = self.translator.translate(request);

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(PushError::Cancelled),
            res = self.provider.send(&message) => res,
        };

        match result {
            Ok(message_id) => {
                tracing::info!(
                    push_token = %request.token,
                    owner = %request.owner,
                    message_id = %message_id,
                    "Sent FCM request"
                );
                self.metrics.sent.add(1, &[]);
                DispatchOutcome::Success(message_id)
            }
            Err(e) => {
                let outcome = classify(&e);
                tracing::error!(
                    error = %e,
                    push_token = %request.token,
                    owner = %request.owner,
                    outcome = outcome.label(),
                    "Failed to send FCM request"
                );
                self.metrics.errors.add(1, &[KeyValue::new("outcome", outcome.label())]);
                if outcome == DispatchOutcome::NotFound {
                    self.metrics.invalidated_tokens.add(1, &[]);
                }
                outcome
            }
        }
    }

    fn reject(&self, err: ValidationError, request: Option<&PushRequest>) -> DispatchOutcome {
        match request {
            Some(request) => tracing::debug!(
                error = %err,
                push_token = %request.token,
                owner = %request.owner,
                "Rejected push request"
            ),
            None => tracing::debug!(error = %err, "Rejected push request"),
        }
        self.metrics.rejected.add(1, &[KeyValue::new("reason", err.reason())]);
        err.into()
    }
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, ValidationError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(ValidationError::PayloadTooLarge { size: None, limit: limit as u64 }),
        Err(e) => Err(ValidationError::BadRequest(format!("failed to read body: {e}"))),
    }
}
