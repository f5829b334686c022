//! Post resolution: cache check, ordered strategy chain, persist.
//!
//! All strategy-level failures are absorbed here; the only error a caller
//! ever sees is `InvalidId`. A chain that comes up empty produces an Empty
//! record so repeat requests inside the TTL window never hit the provider.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ResolveError;
use crate::models::{ExtractedFragment, PostRecord};
use crate::services::cache::RecordCache;
use crate::services::strategy::Strategy;

pub struct Resolver {
    cache: Arc<RecordCache>,
    strategies: Vec<Box<dyn Strategy>>,
    base_url: String,
    ttl: Duration,
    negative_ttl: Duration,
}

/// Cheap structural check on a post id. Current shortcodes start with `C`
/// or `D`; anything else is rejected before touching cache or network.
pub fn valid_post_id(id: &str) -> bool {
    matches!(id.as_bytes().first(), Some(b'C') | Some(b'D'))
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

impl Resolver {
    pub fn new(
        cache: Arc<RecordCache>,
        strategies: Vec<Box<dyn Strategy>>,
        base_url: String,
        ttl: Duration,
        negative_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            strategies,
            base_url,
            ttl,
            negative_ttl,
        }
    }

    pub async fn resolve(&self, id: &str) -> Result<PostRecord, ResolveError> {
        if !valid_post_id(id) {
            return Err(ResolveError::InvalidId);
        }

        match self.cache.get(id).await {
            Ok(Some(record)) => {
                tracing::debug!(id = %id, "cache hit");
                return Ok(record);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::error!(id = %id, error = %err, "cache read failed, treating as miss");
            }
        }

        let mut fragment = None;
        for strategy in &self.strategies {
            match strategy.attempt(id).await {
                Ok(Some(found)) => {
                    tracing::debug!(id = %id, strategy = strategy.name(), "strategy produced data");
                    fragment = Some(found);
                    break;
                }
                Ok(None) => {
                    tracing::debug!(id = %id, strategy = strategy.name(), "no data, trying next");
                }
                Err(err) if err.is_unconfigured() => {
                    tracing::debug!(strategy = strategy.name(), error = %err, "skipping");
                }
                Err(err) => {
                    tracing::warn!(id = %id, strategy = strategy.name(), error = %err, "strategy failed, trying next");
                }
            }
        }

        let record = self.build_record(id, fragment);

        if let Err(err) = self.cache.put(&record).await {
            tracing::error!(id = %id, error = %err, "failed to persist record");
        }

        Ok(record)
    }

    /// Turn a fragment (or nothing) into the canonical record. A chain that
    /// found nothing yields an Empty record on the negative TTL.
    fn build_record(&self, id: &str, fragment: Option<ExtractedFragment>) -> PostRecord {
        let fragment = fragment.unwrap_or_default();
        let username = fragment.username.unwrap_or_default();

        let profile_url = if username.is_empty() {
            String::new()
        } else {
            format!("{}/{}/", self.base_url, username)
        };

        let mut record = PostRecord {
            id: id.to_string(),
            video_url: fragment.video_url,
            thumbnail_url: fragment.thumbnail_url,
            username,
            profile_url,
            permalink: format!("{}/p/{}/", self.base_url, id),
            likes: parse_count(fragment.likes.as_deref()),
            comments: parse_count(fragment.comments.as_deref()),
            views: parse_count(fragment.views.as_deref()),
            expires_at: 0,
        };

        let ttl = if record.is_empty() {
            self.negative_ttl
        } else {
            self.ttl
        };
        record.expires_at = chrono::Utc::now().timestamp() + ttl.as_secs() as i64;

        record
    }
}

/// Engagement counts are decoded as raw strings; absent or unparsable
/// values collapse to zero, never null.
fn parse_count(raw: Option<&str>) -> i64 {
    let Some(raw) = raw else { return 0 };
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}
