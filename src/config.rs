//! Service configuration loaded from environment variables.

use std::time::Duration;

const DEFAULT_BROWSER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:135.0) Gecko/20100101 Firefox/135.0";

#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address, e.g. "0.0.0.0:8080".
    pub bind_addr: String,

    /// SQLite URL backing the record cache. The in-memory default keeps the
    /// service free of external dependencies.
    pub database_url: String,

    /// Provider base URL. Overridable so tests can point at a local server.
    pub base_url: String,

    /// TTL for successfully resolved records.
    pub ttl: Duration,

    /// TTL for Empty (negative-cache) records. Defaults to `ttl`.
    pub negative_ttl: Duration,

    /// How often the cache sweeper reclaims expired rows.
    pub sweep_interval: Duration,

    /// Admission limiter: refill rate (tokens per second) and burst size.
    pub rate: u32,
    pub burst: u32,

    /// Egress proxy pool, comma separated. Empty means all calls go direct.
    pub proxies: Vec<String>,

    /// Route the HTML scraper through the rotator too. Off by default: the
    /// embed endpoint tolerates direct traffic and skipping the proxy hop
    /// is faster.
    pub proxy_scrape: bool,

    /// Credentials for the api-fetch strategy. Any of them missing makes
    /// that strategy decline instantly.
    pub session_cookie: String,
    pub app_id: String,
    pub browser_agent: String,

    /// Per-attempt timeout for outbound provider calls.
    pub request_timeout: Duration,

    /// Redirect non-embed user agents straight to the provider.
    pub redirect_browsers: bool,

    /// Ordered strategy chain by name ("html", "api").
    pub strategies: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let ttl_secs = env_parse("VXGRAM_TTL_SECS", 86_400u64)?;
        let negative_ttl_secs = env_parse("VXGRAM_NEGATIVE_TTL_SECS", ttl_secs)?;

        let config = Self {
            bind_addr: env_or("VXGRAM_BIND_ADDR", "0.0.0.0:8080"),
            database_url: env_or("VXGRAM_DATABASE_URL", "sqlite::memory:"),
            base_url: env_or("VXGRAM_BASE_URL", "https://www.instagram.com")
                .trim_end_matches('/')
                .to_string(),
            ttl: Duration::from_secs(ttl_secs),
            negative_ttl: Duration::from_secs(negative_ttl_secs),
            sweep_interval: Duration::from_secs(env_parse("VXGRAM_SWEEP_INTERVAL_SECS", 300)?),
            rate: env_parse("VXGRAM_RATE", 5)?,
            burst: env_parse("VXGRAM_BURST", 10)?,
            proxies: env_list("VXGRAM_PROXIES"),
            proxy_scrape: env_parse("VXGRAM_PROXY_SCRAPE", false)?,
            session_cookie: env_or("VXGRAM_SESSION_COOKIE", ""),
            app_id: env_or("VXGRAM_APP_ID", ""),
            browser_agent: env_or("VXGRAM_BROWSER_AGENT", DEFAULT_BROWSER_AGENT),
            request_timeout: Duration::from_secs(env_parse("VXGRAM_REQUEST_TIMEOUT_SECS", 5)?),
            redirect_browsers: env_parse("VXGRAM_REDIRECT_BROWSERS", false)?,
            strategies: {
                let names = env_list("VXGRAM_STRATEGIES");
                if names.is_empty() {
                    vec!["html".to_string(), "api".to_string()]
                } else {
                    names
                }
            },
        };

        if config.ttl.is_zero() {
            anyhow::bail!("VXGRAM_TTL_SECS must be greater than zero");
        }
        if config.rate == 0 || config.burst == 0 {
            anyhow::bail!("VXGRAM_RATE and VXGRAM_BURST must be greater than zero");
        }

        if config.proxies.len() <= 1 {
            tracing::warn!("no egress proxies configured; provider throttling is more likely");
        }

        tracing::info!(
            bind_addr = %config.bind_addr,
            base_url = %config.base_url,
            ttl_secs = config.ttl.as_secs(),
            negative_ttl_secs = config.negative_ttl.as_secs(),
            proxies = config.proxies.len(),
            strategies = ?config.strategies,
            "configuration loaded"
        );

        Ok(config)
    }

    /// Baseline configuration for unit tests; no env access.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            database_url: "sqlite::memory:".to_string(),
            base_url: "http://127.0.0.1:1".to_string(),
            ttl: Duration::from_secs(3600),
            negative_ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(300),
            rate: 5,
            burst: 10,
            proxies: Vec::new(),
            proxy_scrape: false,
            session_cookie: String::new(),
            app_id: String::new(),
            browser_agent: DEFAULT_BROWSER_AGENT.to_string(),
            request_timeout: Duration::from_secs(5),
            redirect_browsers: false,
            strategies: vec!["html".to_string(), "api".to_string()],
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key}={raw:?}: {e}")),
        Err(_) => Ok(default),
    }
}

fn env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that manipulate process environment.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_KEYS: &[&str] = &[
        "VXGRAM_BIND_ADDR",
        "VXGRAM_DATABASE_URL",
        "VXGRAM_BASE_URL",
        "VXGRAM_TTL_SECS",
        "VXGRAM_NEGATIVE_TTL_SECS",
        "VXGRAM_SWEEP_INTERVAL_SECS",
        "VXGRAM_RATE",
        "VXGRAM_BURST",
        "VXGRAM_PROXIES",
        "VXGRAM_PROXY_SCRAPE",
        "VXGRAM_SESSION_COOKIE",
        "VXGRAM_APP_ID",
        "VXGRAM_BROWSER_AGENT",
        "VXGRAM_REQUEST_TIMEOUT_SECS",
        "VXGRAM_REDIRECT_BROWSERS",
        "VXGRAM_STRATEGIES",
    ];

    fn with_env_vars<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_MUTEX.lock().unwrap();

        let saved: Vec<_> = ENV_KEYS
            .iter()
            .map(|k| (*k, std::env::var(k).ok()))
            .collect();

        // SAFETY: serialized by the mutex; only test code touches these keys.
        unsafe {
            for k in ENV_KEYS {
                std::env::remove_var(k);
            }
            for (k, v) in vars {
                std::env::set_var(k, v);
            }
        }

        f();

        // SAFETY: restoring the original environment, still serialized.
        unsafe {
            for (k, v) in &saved {
                match v {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    #[test]
    fn defaults() {
        with_env_vars(&[], || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.bind_addr, "0.0.0.0:8080");
            assert_eq!(config.base_url, "https://www.instagram.com");
            assert_eq!(config.ttl, Duration::from_secs(86_400));
            assert_eq!(config.negative_ttl, config.ttl);
            assert_eq!(config.rate, 5);
            assert_eq!(config.burst, 10);
            assert!(config.proxies.is_empty());
            assert!(!config.proxy_scrape);
            assert_eq!(config.strategies, vec!["html", "api"]);
        });
    }

    #[test]
    fn custom_values_and_proxy_list() {
        with_env_vars(
            &[
                ("VXGRAM_BASE_URL", "https://provider.test/"),
                ("VXGRAM_TTL_SECS", "60"),
                ("VXGRAM_NEGATIVE_TTL_SECS", "5"),
                ("VXGRAM_PROXIES", "http://p1:1, http://p2:2 ,"),
                ("VXGRAM_STRATEGIES", "api,html"),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.base_url, "https://provider.test");
                assert_eq!(config.ttl, Duration::from_secs(60));
                assert_eq!(config.negative_ttl, Duration::from_secs(5));
                assert_eq!(config.proxies, vec!["http://p1:1", "http://p2:2"]);
                assert_eq!(config.strategies, vec!["api", "html"]);
            },
        );
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        with_env_vars(&[("VXGRAM_TTL_SECS", "soon")], || {
            assert!(Config::from_env().is_err());
        });
        with_env_vars(&[("VXGRAM_RATE", "0")], || {
            assert!(Config::from_env().is_err());
        });
    }
}
