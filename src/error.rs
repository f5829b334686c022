//! Error taxonomy and HTTP response mapping.
//!
//! Strategy-level failures never leave the resolver; only invalid input and
//! relay-stage failures are surfaced to the caller.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Failure of a single extraction strategy. The resolver logs these and
/// moves on to the next strategy in the chain.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    /// Required credential or setting is missing. Cheap to detect, always
    /// skipped without a network round-trip.
    #[error("missing configuration: {0}")]
    Unconfigured(&'static str),

    /// Network failure, timeout, or non-success status.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider response could not be decoded.
    #[error("response decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl StrategyError {
    pub fn is_unconfigured(&self) -> bool {
        matches!(self, Self::Unconfigured(_))
    }
}

/// Request-fatal resolution failure. Everything else is absorbed into a
/// negative-cache record.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid post id")]
    InvalidId,
}

/// Relay-stage failure. Terminal for the request: once a media URL has been
/// chosen there is no further fallback.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("unparsable media url: {0}")]
    BadUrl(#[from] url::ParseError),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

/// Route-facing error that converts to an HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream failure: {0}")]
    Relay(#[from] RelayError),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Relay(err) => {
                tracing::error!(error = %err, "relay upstream failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "failed to reach the media origin".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
