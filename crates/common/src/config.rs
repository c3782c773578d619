use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Telegram bot token (required by the bot binary)
    pub telegram_bot_token: Option<String>,

    /// PostgreSQL connection string. When absent the tracker falls back to
    /// a non-durable in-memory store.
    pub database_url: Option<String>,

    /// Maximum number of PostgreSQL connections in the pool (default: 10)
    pub db_max_connections: u32,

    /// Redis connection string, enables the cross-process cycle lease
    pub redis_url: Option<String>,

    /// Seconds between tracker cycles (default: 20)
    pub poll_interval_secs: u64,

    /// Pause between per-token fetches inside a cycle (default: 500ms)
    pub request_delay_ms: u64,

    /// Redis key of the cycle lease; replicas sharing one store must agree on it
    pub lease_key: String,

    /// TTL of the Redis cycle lease in seconds (default: 120)
    pub lease_ttl_secs: u64,

    /// Per-request timeout for market data upstreams (default: 8s)
    pub fetch_timeout_secs: u64,

    /// Token-bucket refill rate per upstream provider (default: 2 req/s)
    pub upstream_requests_per_sec: f64,

    /// DexScreener API base URL
    pub dexscreener_base_url: String,

    /// pump.fun frontend API base URL
    pub pumpfun_base_url: String,

    /// Bind address for the HTTP API
    pub api_bind_addr: String,

    /// Shared secret expected in the `x-api-key` header
    pub api_key: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            telegram_bot_token: optional("TELEGRAM_BOT_TOKEN"),
            database_url: optional("DATABASE_URL"),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 10)?,
            redis_url: optional("REDIS_URL"),
            poll_interval_secs: parsed("TRACKER_POLL_INTERVAL_SECS", 20)?,
            request_delay_ms: parsed("TRACKER_REQUEST_DELAY_MS", 500)?,
            lease_key: optional("TRACKER_LEASE_KEY")
                .unwrap_or_else(|| "pump:tracker:cycle_lease".to_string()),
            lease_ttl_secs: parsed("TRACKER_LEASE_TTL_SECS", 120)?,
            fetch_timeout_secs: parsed("FETCH_TIMEOUT_SECS", 8)?,
            upstream_requests_per_sec: parsed("UPSTREAM_REQUESTS_PER_SEC", 2.0)?,
            dexscreener_base_url: std::env::var("DEXSCREENER_BASE_URL")
                .unwrap_or_else(|_| "https://api.dexscreener.com".to_string()),
            pumpfun_base_url: std::env::var("PUMPFUN_BASE_URL")
                .unwrap_or_else(|_| "https://frontend-api.pump.fun".to_string()),
            api_bind_addr: std::env::var("API_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            api_key: optional("API_KEY"),
        })
        .and_then(Self::validated)
    }

    /// The Telegram token, or a startup error if it was not provided.
    pub fn require_telegram_token(&self) -> anyhow::Result<&str> {
        self.telegram_bot_token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("TELEGRAM_BOT_TOKEN environment variable is required"))
    }

    /// The API key, or a startup error if it was not provided.
    pub fn require_api_key(&self) -> anyhow::Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("API_KEY environment variable is required"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }

    fn validated(self) -> anyhow::Result<Self> {
        if self.poll_interval_secs == 0 {
            anyhow::bail!("TRACKER_POLL_INTERVAL_SECS must be greater than zero");
        }
        if !(self.upstream_requests_per_sec.is_finite() && self.upstream_requests_per_sec > 0.0) {
            anyhow::bail!("UPSTREAM_REQUESTS_PER_SEC must be a positive number");
        }
        Ok(self)
    }
}

/// Read an optional variable, treating an empty value as unset.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid {}", key, std::any::type_name::<T>())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AppConfig {
        AppConfig {
            telegram_bot_token: None,
            database_url: None,
            db_max_connections: 10,
            redis_url: None,
            poll_interval_secs: 20,
            request_delay_ms: 500,
            lease_key: "pump:tracker:cycle_lease".to_string(),
            lease_ttl_secs: 120,
            fetch_timeout_secs: 8,
            upstream_requests_per_sec: 2.0,
            dexscreener_base_url: "https://api.dexscreener.com".to_string(),
            pumpfun_base_url: "https://frontend-api.pump.fun".to_string(),
            api_bind_addr: "0.0.0.0:3000".to_string(),
            api_key: None,
        }
    }

    #[test]
    fn test_durations() {
        let config = base();
        assert_eq!(config.poll_interval(), Duration::from_secs(20));
        assert_eq!(config.request_delay(), Duration::from_millis(500));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(8));
        assert_eq!(config.lease_ttl(), Duration::from_secs(120));
    }

    #[test]
    fn test_missing_telegram_token_is_an_error() {
        assert!(base().require_telegram_token().is_err());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = AppConfig {
            poll_interval_secs: 0,
            ..base()
        };
        assert!(config.validated().is_err());
    }

    #[test]
    fn test_non_positive_rate_rejected() {
        let config = AppConfig {
            upstream_requests_per_sec: 0.0,
            ..base()
        };
        assert!(config.validated().is_err());
    }
}
