pub mod dexscreener;
pub mod pumpfun;
pub mod rate_limit;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use thiserror::Error;

use pump_common::config::AppConfig;
use pump_common::types::{DataSource, MarketCapReading, UNKNOWN_NAME, mint_prefix};

use crate::dexscreener::DexScreenerProvider;
use crate::pumpfun::PumpFunProvider;
use crate::rate_limit::RateLimiter;

const USER_AGENT: &str = "Mozilla/5.0";

/// Reasons a single provider request did not yield a reading.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid upstream URL: {0}")]
    InvalidUrl(String),
}

/// Trait that every upstream market data provider implements.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn source(&self) -> DataSource;

    /// Query the provider for a mint.
    /// Returns `Ok(None)` when the provider does not list the mint.
    async fn fetch_market_cap(&self, mint: &str) -> Result<Option<MarketCapReading>, FetchError>;
}

/// Anything that can turn a mint into a current market-cap reading.
///
/// `None` means "no data this time" and is never fatal to the caller.
#[async_trait]
pub trait MarketCapSource: Send + Sync {
    async fn fetch(&self, mint: &str) -> Option<MarketCapReading>;
}

/// Ordered fallback across market data providers.
///
/// Providers are queried in order; the first reading with a positive market
/// cap wins. Errors, unlisted mints and non-positive caps all fall through to
/// the next provider.
pub struct MarketDataFetcher {
    providers: Vec<Box<dyn MarketDataProvider>>,
}

impl MarketDataFetcher {
    /// DexScreener first, pump.fun second, sharing one HTTP client.
    pub fn from_config(config: &AppConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.fetch_timeout())
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        let rate = config.upstream_requests_per_sec;
        tracing::info!(
            timeout_secs = config.fetch_timeout_secs,
            requests_per_sec = rate,
            "Market data fetcher configured (dexscreener → pumpfun)"
        );

        Ok(Self::with_providers(vec![
            Box::new(DexScreenerProvider::new(
                client.clone(),
                &config.dexscreener_base_url,
                Arc::new(RateLimiter::per_second(rate)),
            )?),
            Box::new(PumpFunProvider::new(
                client,
                &config.pumpfun_base_url,
                Arc::new(RateLimiter::per_second(rate)),
            )?),
        ]))
    }

    pub fn with_providers(providers: Vec<Box<dyn MarketDataProvider>>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl MarketCapSource for MarketDataFetcher {
    async fn fetch(&self, mint: &str) -> Option<MarketCapReading> {
        let short = mint_prefix(mint);

        for provider in &self.providers {
            let source = provider.source();
            match provider.fetch_market_cap(mint).await {
                Ok(Some(reading)) if reading.is_usable() => {
                    tracing::debug!(
                        mint = short,
                        source = %source,
                        market_cap = reading.market_cap_usd,
                        "Market cap fetched"
                    );
                    return Some(reading);
                }
                Ok(Some(reading)) => {
                    tracing::debug!(
                        mint = short,
                        source = %source,
                        market_cap = reading.market_cap_usd,
                        "Provider returned no positive market cap"
                    );
                }
                Ok(None) => {
                    tracing::debug!(mint = short, source = %source, "Mint not listed by provider");
                }
                Err(e) => {
                    tracing::warn!(mint = short, source = %source, error = %e, "Market data fetch failed");
                }
            }
        }

        None
    }
}

pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, FetchError> {
    let url = Url::parse(base_url)
        .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", base_url, e)))?;
    if url.cannot_be_a_base() {
        return Err(FetchError::InvalidUrl(base_url.to_string()));
    }
    Ok(url)
}

/// `{base}/{segments}/{mint}`, with the mint percent-encoded as one path segment.
pub(crate) fn endpoint(base: &Url, segments: &[&str], mint: &str) -> Result<Url, FetchError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| FetchError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments)
        .push(mint);
    Ok(url)
}

/// Display name resolution: name, then symbol, then `"Unknown"`.
pub(crate) fn resolve_name(name: Option<&str>, symbol: Option<&str>) -> String {
    name.map(str::trim)
        .filter(|n| !n.is_empty())
        .or_else(|| symbol.map(str::trim).filter(|s| !s.is_empty()))
        .unwrap_or(UNKNOWN_NAME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Reply {
        Cap(f64),
        Unlisted,
        BadStatus,
        Malformed,
    }

    struct StubProvider {
        source: DataSource,
        reply: Reply,
        calls: Arc<AtomicUsize>,
    }

    impl StubProvider {
        fn boxed(source: DataSource, reply: Reply, calls: &Arc<AtomicUsize>) -> Box<dyn MarketDataProvider> {
            Box::new(Self {
                source,
                reply,
                calls: Arc::clone(calls),
            })
        }
    }

    #[async_trait]
    impl MarketDataProvider for StubProvider {
        fn source(&self) -> DataSource {
            self.source
        }

        async fn fetch_market_cap(&self, _mint: &str) -> Result<Option<MarketCapReading>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Cap(mc) => Ok(Some(MarketCapReading {
                    market_cap_usd: mc,
                    name: format!("{}-token", self.source),
                    source: self.source,
                })),
                Reply::Unlisted => Ok(None),
                Reply::BadStatus => Err(FetchError::Status(reqwest::StatusCode::from_u16(530).unwrap())),
                Reply::Malformed => Err(serde_json::from_str::<serde_json::Value>("{").unwrap_err().into()),
            }
        }
    }

    fn fetcher(a: Reply, b: Reply) -> (MarketDataFetcher, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let a_calls = Arc::new(AtomicUsize::new(0));
        let b_calls = Arc::new(AtomicUsize::new(0));
        let fetcher = MarketDataFetcher::with_providers(vec![
            StubProvider::boxed(DataSource::DexScreener, a, &a_calls),
            StubProvider::boxed(DataSource::PumpFun, b, &b_calls),
        ]);
        (fetcher, a_calls, b_calls)
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let (fetcher, a, b) = fetcher(Reply::Cap(100.0), Reply::Cap(200.0));
        let reading = fetcher.fetch("mint").await.unwrap();
        assert_eq!(reading.source, DataSource::DexScreener);
        assert_eq!(reading.market_cap_usd, 100.0);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_primary_error_falls_back() {
        let (fetcher, _, b) = fetcher(Reply::BadStatus, Reply::Cap(200.0));
        let reading = fetcher.fetch("mint").await.unwrap();
        assert_eq!(reading.source, DataSource::PumpFun);
        assert_eq!(reading.market_cap_usd, 200.0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_primary_zero_cap_falls_back() {
        let (fetcher, _, _) = fetcher(Reply::Cap(0.0), Reply::Cap(5.0));
        let reading = fetcher.fetch("mint").await.unwrap();
        assert_eq!(reading.source, DataSource::PumpFun);
    }

    #[tokio::test]
    async fn test_primary_unlisted_falls_back() {
        let (fetcher, _, _) = fetcher(Reply::Unlisted, Reply::Cap(5.0));
        assert_eq!(fetcher.fetch("mint").await.unwrap().source, DataSource::PumpFun);
    }

    #[tokio::test]
    async fn test_both_failing_is_none() {
        let (fetcher, a, b) = fetcher(Reply::Malformed, Reply::BadStatus);
        assert!(fetcher.fetch("mint").await.is_none());
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_negative_caps_are_none() {
        let (fetcher, _, _) = fetcher(Reply::Cap(-1.0), Reply::Cap(0.0));
        assert!(fetcher.fetch("mint").await.is_none());
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let base = parse_base_url("https://api.dexscreener.com").unwrap();
        let url = endpoint(&base, &["latest", "dex", "tokens"], "Mint111").unwrap();
        assert_eq!(url.as_str(), "https://api.dexscreener.com/latest/dex/tokens/Mint111");

        let base = parse_base_url("https://frontend-api.pump.fun/").unwrap();
        let url = endpoint(&base, &["coins"], "Mint111").unwrap();
        assert_eq!(url.as_str(), "https://frontend-api.pump.fun/coins/Mint111");
    }

    #[test]
    fn test_endpoint_escapes_mint() {
        let base = parse_base_url("https://frontend-api.pump.fun").unwrap();
        let url = endpoint(&base, &["coins"], "a/b?c#d").unwrap();
        assert_eq!(url.path(), "/coins/a%2Fb%3Fc%23d");
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(matches!(parse_base_url("not a url"), Err(FetchError::InvalidUrl(_))));
        assert!(matches!(parse_base_url("mailto:ops@example.com"), Err(FetchError::InvalidUrl(_))));
    }

    #[test]
    fn test_resolve_name_order() {
        assert_eq!(resolve_name(Some("Name"), Some("SYM")), "Name");
        assert_eq!(resolve_name(Some("  "), Some("SYM")), "SYM");
        assert_eq!(resolve_name(None, Some("SYM")), "SYM");
        assert_eq!(resolve_name(None, None), "Unknown");
        assert_eq!(resolve_name(Some(""), Some("")), "Unknown");
    }
}
