//! Media relay endpoint (/video).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use crate::AppState;
use crate::error::ApiError;
use crate::services::relay;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/video/{id}", get(serve_video))
}

/// GET /video/:id - resolve the post and stream its video back through us.
/// CDN URLs are signed and short-lived, so clients embed this stable URL
/// instead of the raw one.
async fn serve_video(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let record = state
        .resolver
        .resolve(&id)
        .await
        .map_err(|_| ApiError::BadRequest("invalid post id".to_string()))?;

    let Some(video_url) = record.video_url else {
        return Err(ApiError::NotFound(
            "post has no playable video".to_string(),
        ));
    };

    Ok(relay::relay(&state.relay, &video_url, &headers).await?)
}
