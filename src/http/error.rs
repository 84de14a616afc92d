//! Maps [`DispatchError`] onto HTTP status codes and JSON error bodies.
//!
//! Grounded on the `IntoResponse` pattern in `server/error/mod.rs` of the
//! Bifrost example: a single error type implementing `IntoResponse`,
//! logging unexpected failures while returning a stable JSON shape to the
//! client. Status codes for the `jobs/*` routes follow the original
//! `router.c`'s `HTTP_NOT_FOUND` for unknown job ids. Canceling a
//! terminal job is not an error at this layer: `Dispatcher::cancel_job`
//! reports it as `Ok(false)`, and the route answers 200 with
//! `{"status":"not_cancelable"}` (see DESIGN.md). 503 + `Retry-After`
//! for queue-full is new, since the original C server never implemented
//! backpressure.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::core::DispatchError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_ms: Option<u64>,
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let (status, retry_after_ms) = match &self {
            Self::MissingParameter(_) | Self::InvalidParameter(_, _) => {
                (StatusCode::BAD_REQUEST, None)
            }
            Self::UnknownRoute(_) | Self::NotFound => (StatusCode::NOT_FOUND, None),
            Self::Full { retry_after_ms } => (StatusCode::SERVICE_UNAVAILABLE, Some(*retry_after_ms)),
            Self::ShuttingDown => (StatusCode::SERVICE_UNAVAILABLE, None),
            Self::HandlerFailure(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "handler failure");
        }

        let body = ErrorBody {
            error: self.to_string(),
            retry_after_ms,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(ms) = retry_after_ms {
            let seconds = ms.div_ceil(1000).max(1);
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response
    }
}
