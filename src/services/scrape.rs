//! HTML-scrape extraction strategy.
//!
//! Fetches the provider's embeddable page variant with a desktop browser
//! user-agent and scans the body line by line as it streams in. The marker
//! block usually appears early, so the body is never buffered whole.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use futures::StreamExt;
use reqwest::header::USER_AGENT;

use crate::config::Config;
use crate::error::StrategyError;
use crate::models::ExtractedFragment;
use crate::services::extract::extract_fields;
use crate::services::rotation::{EgressRotator, direct_client};
use crate::services::strategy::Strategy;

/// Cap on how much of a single line is buffered while waiting for its
/// newline. The page is often minified into one enormous line; the marker
/// block sits well inside this window when it exists at all.
const MAX_LINE_BYTES: usize = 1024 * 1024;

pub struct HtmlScrape {
    base_url: String,
    browser_agent: String,
    rotator: Option<Arc<EgressRotator>>,
    timeout: Duration,
}

impl HtmlScrape {
    /// The embed endpoint is rarely rate-limited as aggressively as the
    /// API, so rotation is opt-in here (`proxy_scrape`).
    pub fn new(config: &Config, rotator: Arc<EgressRotator>) -> Self {
        Self {
            base_url: config.base_url.clone(),
            browser_agent: config.browser_agent.clone(),
            rotator: config.proxy_scrape.then_some(rotator),
            timeout: config.request_timeout,
        }
    }
}

#[async_trait]
impl Strategy for HtmlScrape {
    fn name(&self) -> &'static str {
        "html-scrape"
    }

    async fn attempt(&self, id: &str) -> Result<Option<ExtractedFragment>, StrategyError> {
        let origin = format!("{}/p/{}/embed/captioned", self.base_url, id);
        tracing::debug!(origin = %origin, "scraping embed page");

        let client = match &self.rotator {
            Some(rotator) => rotator.next_client(self.timeout),
            None => direct_client(self.timeout),
        };

        let response = client
            .get(&origin)
            .header(USER_AGENT, &self.browser_agent)
            .send()
            .await?
            .error_for_status()?;

        // Incremental scan: accumulate chunks only up to the next newline,
        // hand each complete line to the extractor, stop at the first hit.
        let mut stream = response.bytes_stream();
        let mut carry = BytesMut::new();

        while let Some(chunk) = stream.next().await {
            carry.extend_from_slice(&chunk?);

            while let Some(newline) = carry.iter().position(|&b| b == b'\n') {
                let line = carry.split_to(newline + 1);
                let line = String::from_utf8_lossy(&line);
                if let Some(fragment) = extract_fields(&line) {
                    tracing::debug!(id = %id, "embed page yielded a fragment");
                    return Ok(Some(fragment));
                }
            }

            // A newline-free body must not be buffered whole. Once the cap
            // is hit, scan what arrived and give up on the rest.
            if carry.len() > MAX_LINE_BYTES {
                let line = String::from_utf8_lossy(&carry);
                if let Some(fragment) = extract_fields(&line) {
                    return Ok(Some(fragment));
                }
                tracing::warn!(id = %id, "oversized embed page line, aborting scan");
                return Ok(None);
            }
        }

        // Body may end without a trailing newline.
        if !carry.is_empty() {
            let line = String::from_utf8_lossy(&carry);
            if let Some(fragment) = extract_fields(&line) {
                return Ok(Some(fragment));
            }
        }

        Ok(None)
    }
}
