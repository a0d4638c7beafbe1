use crate::api::AppState;
use crate::domain::push::DispatchOutcome;
use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

pub const PUSH_PATH: &str = "/_gomuks/push/fcm";

/// Relays a push request to FCM.
///
/// The response never has a body; the status code carries the whole result.
pub async fn push_proxy(State(state): State<AppState>, request: Request) -> DispatchOutcome {
    let content_length = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    state.dispatcher.handle(content_length, request.into_body(), &state.hard_stop).await
}

impl DispatchOutcome {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Success(_) => StatusCode::OK,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::ProviderError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DispatchOutcome {
    fn into_response(self) -> Response {
        self.status_code().into_response()
    }
}
