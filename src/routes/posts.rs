//! Post embed and detail endpoints (/p, /reel, /reels, /share, /api/posts).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;
use crate::models::MediaKind;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/p/{id}", get(serve_post))
        .route("/reel/{id}", get(serve_post))
        .route("/reels/{id}", get(serve_post))
        .route("/share/{id}", get(follow_share))
        .route("/api/posts/{id}", get(post_details))
}

/// Open-Graph-shaped payload the embed renderer consumes.
#[derive(Debug, Serialize)]
pub struct EmbedData {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_url: Option<String>,
}

impl EmbedData {
    fn message(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            video_url: None,
            image_url: None,
            post_url: None,
        }
    }
}

async fn serve_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    process_post(&state, &id, &headers).await
}

/// Shared path for every endpoint that ends in an embed payload; they only
/// differ in how the post id arrives.
async fn process_post(state: &AppState, id: &str, headers: &HeaderMap) -> Response {
    tracing::debug!(id = %id, "processing post request");

    // Embed scrapers (Discord and friends) get the payload; everyone else
    // can be bounced straight to the provider when so configured.
    if state.config.redirect_browsers && !is_embed_agent(headers) {
        let target = format!("{}/p/{}/", state.config.base_url, id);
        tracing::debug!(id = %id, "redirecting browser to provider");
        return Redirect::permanent(&target).into_response();
    }

    let record = match state.resolver.resolve(id).await {
        Ok(record) => record,
        Err(err) => {
            tracing::debug!(id = %id, error = %err, "invalid post id");
            return Json(EmbedData::message(
                "vxgram - Not found",
                "An invalid post ID was provided. Please make sure the URL is correct",
            ))
            .into_response();
        }
    };

    match record.media_kind() {
        MediaKind::Empty => Json(EmbedData::message(
            "vxgram - Empty Response",
            "The provider returned nothing for this post. It may be private or removed.",
        ))
        .into_response(),

        MediaKind::ImageOnly => Json(EmbedData {
            title: format!("@{}", record.username),
            description: String::new(),
            video_url: None,
            image_url: record.thumbnail_url,
            post_url: Some(record.permalink),
        })
        .into_response(),

        MediaKind::Video => Json(EmbedData {
            title: format!("Post by @{}", record.username),
            description: format!(
                "❤️ {} 💬 {} 👁️ {}",
                record.likes, record.comments, record.views
            ),
            video_url: record.video_url,
            image_url: record.thumbnail_url,
            post_url: Some(record.permalink),
        })
        .into_response(),
    }
}

/// Posts shared from the phone app hide behind a redirect id; the real
/// shortcode only appears after following the provider's redirect chain.
async fn follow_share(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let share_url = format!("{}/share/{}", state.config.base_url, id);

    let response = match state.http.get(&share_url).send().await {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, "failed to follow share redirects");
            return Json(EmbedData::message(
                "vxgram - Server Error",
                "Could not follow the share link to the original post.",
            ))
            .into_response();
        }
    };

    match post_id_from_path(response.url().path()) {
        Some(post_id) => process_post(&state, &post_id, &headers).await,
        None => Json(EmbedData::message(
            "vxgram - Not found",
            "The share link did not lead to a post.",
        ))
        .into_response(),
    }
}

/// GET /api/posts/:id - raw resolved record.
async fn post_details(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<crate::models::PostRecord>, ApiError> {
    let record = state
        .resolver
        .resolve(&id)
        .await
        .map_err(|_| ApiError::BadRequest("invalid post id".to_string()))?;

    if record.is_empty() {
        return Err(ApiError::NotFound(
            "no data found for post; it may be private or the provider is blocking us".to_string(),
        ));
    }

    Ok(Json(record))
}

/// The final shortcode is the last non-empty path segment of wherever the
/// redirect chain landed, e.g. "/reel/DXYZ12345/".
fn post_id_from_path(path: &str) -> Option<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .next_back()
        .map(str::to_string)
}

fn is_embed_agent(headers: &HeaderMap) -> bool {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_lowercase)
        .is_some_and(|ua| ua.contains("discord"))
}
