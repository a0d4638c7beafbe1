use crate::adapters::push::PushError;
use crate::domain::push::DispatchOutcome;

// FCM v1 error codes for a registration that will never work again.
const UNREGISTERED: &str = "UNREGISTERED";
const SENDER_ID_MISMATCH: &str = "SENDER_ID_MISMATCH";

// Messages FCM pairs with the codes above, for errors that carry no code.
const ENTITY_NOT_FOUND_MESSAGE: &str = "Requested entity was not found.";
const SENDER_ID_MISMATCH_MESSAGE: &str = "SenderId mismatch";

/// Decides whether a provider failure means the recipient token is dead.
#[must_use]
pub fn classify(err: &PushError) -> DispatchOutcome {
    let recipient_invalid = match err {
        PushError::Api { error_code: Some(code), .. } => code == UNREGISTERED || code == SENDER_ID_MISMATCH,
        PushError::Api { message, .. } => is_recipient_invalid_message(message),
        PushError::Other(inner) => is_recipient_invalid_message(&inner.to_string()),
        PushError::Transport(_) | PushError::Auth(_) | PushError::Cancelled => false,
    };

    if recipient_invalid { DispatchOutcome::NotFound } else { DispatchOutcome::ProviderError }
}

fn is_recipient_invalid_message(message: &str) -> bool {
    message == ENTITY_NOT_FOUND_MESSAGE || message == SENDER_ID_MISMATCH_MESSAGE
}
