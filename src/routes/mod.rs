//! HTTP surface: route registration and admission control.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::AppState;

pub mod media;
pub mod posts;

/// Assemble the full router. Post and media routes sit behind the admission
/// limiter; the health probe does not.
pub fn build_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(posts::routes())
        .merge(media::routes())
        .layer(middleware::from_fn_with_state(state.clone(), admission))
        .route("/health", get(health))
        .with_state(state)
}

async fn admission(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    if state.limiter.allow() {
        return next.run(request).await;
    }

    tracing::debug!(path = %request.uri().path(), "request denied by admission limiter");
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({ "error": "too many requests" })),
    )
        .into_response()
}

async fn health() -> &'static str {
    "ok"
}
