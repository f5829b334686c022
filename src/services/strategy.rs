//! The extraction strategy seam and chain construction.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::StrategyError;
use crate::models::ExtractedFragment;
use crate::services::api_fetch::ApiFetch;
use crate::services::rotation::EgressRotator;
use crate::services::scrape::HtmlScrape;

/// One independent method of obtaining post data from the provider.
///
/// `Ok(None)` is a clean "no data here" and moves the chain along;
/// errors are logged by the resolver and likewise skipped.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, id: &str) -> Result<Option<ExtractedFragment>, StrategyError>;
}

/// Build the ordered strategy chain named by the configuration. Unknown
/// strategy names are a startup error, not a silent skip.
pub fn build_chain(
    config: &Config,
    rotator: &Arc<EgressRotator>,
) -> anyhow::Result<Vec<Box<dyn Strategy>>> {
    let mut chain: Vec<Box<dyn Strategy>> = Vec::with_capacity(config.strategies.len());

    for name in &config.strategies {
        match name.as_str() {
            "html" => chain.push(Box::new(HtmlScrape::new(config, rotator.clone()))),
            "api" => chain.push(Box::new(ApiFetch::new(config, rotator.clone()))),
            other => anyhow::bail!("unknown extraction strategy {other:?} (expected html or api)"),
        }
    }

    if chain.is_empty() {
        anyhow::bail!("no extraction strategies configured");
    }

    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_configured_chain_in_order() {
        let mut config = Config::for_tests();
        config.strategies = vec!["html".to_string(), "api".to_string()];
        let rotator = Arc::new(EgressRotator::new(vec![]));

        let chain = build_chain(&config, &rotator).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].name(), "html-scrape");
        assert_eq!(chain[1].name(), "api-fetch");
    }

    #[test]
    fn unknown_strategy_name_is_an_error() {
        let mut config = Config::for_tests();
        config.strategies = vec!["html".to_string(), "graphql".to_string()];
        let rotator = Arc::new(EgressRotator::new(vec![]));

        assert!(build_chain(&config, &rotator).is_err());
    }

    #[test]
    fn empty_chain_is_an_error() {
        let mut config = Config::for_tests();
        config.strategies = vec![];
        let rotator = Arc::new(EgressRotator::new(vec![]));

        assert!(build_chain(&config, &rotator).is_err());
    }
}
