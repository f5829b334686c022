pub mod api_fetch;
pub mod cache;
pub mod extract;
pub mod rate_limit;
pub mod relay;
pub mod resolver;
pub mod rotation;
pub mod scrape;
pub mod strategy;
pub mod unescape;
