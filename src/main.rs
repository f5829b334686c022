use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod config;
mod error;
mod models;
mod routes;
mod services;

use config::Config;
use services::cache::RecordCache;
use services::rate_limit::TokenBucket;
use services::resolver::Resolver;
use services::rotation::EgressRotator;
use services::strategy;

/// Shared application state handed to every route.
pub struct AppState {
    pub config: Config,
    pub resolver: Resolver,
    pub limiter: TokenBucket,
    /// Follows redirect chains (share links). Short total timeout.
    pub http: reqwest::Client,
    /// Streams media bodies. Connect timeout only; transfers can be long.
    pub relay: reqwest::Client,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vxgram=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let connect = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    // An in-memory SQLite database exists per connection; the pool must not
    // open a second one.
    let max_connections = if config.database_url.contains(":memory:") {
        1
    } else {
        5
    };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(connect)
        .await?;

    let cache = Arc::new(RecordCache::init(pool).await?);
    let _sweeper = cache.clone().spawn_sweeper(config.sweep_interval);

    let rotator = Arc::new(EgressRotator::new(config.proxies.clone()));
    let strategies = strategy::build_chain(&config, &rotator)?;
    let resolver = Resolver::new(
        cache,
        strategies,
        config.base_url.clone(),
        config.ttl,
        config.negative_ttl,
    );

    let limiter = TokenBucket::new(config.rate, config.burst);

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;
    let relay = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState {
        config,
        resolver,
        limiter,
        http,
        relay,
    });

    let app = routes::build_routes(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
