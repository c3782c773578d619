//! DexScreener client: primary market data provider.
//!
//! `GET /latest/dex/tokens/{mint}` returns every trading pair the mint is
//! listed in. The deepest pair (highest USD liquidity) is taken as the
//! reference market.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use pump_common::types::{DataSource, MarketCapReading};

use crate::rate_limit::RateLimiter;
use crate::{FetchError, MarketDataProvider, endpoint, parse_base_url, resolve_name};

#[derive(Debug, Deserialize)]
struct TokenPairsResponse {
    #[serde(default)]
    pairs: Option<Vec<Pair>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pair {
    #[serde(default)]
    base_token: Option<BaseToken>,
    #[serde(default)]
    liquidity: Option<Liquidity>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    fdv: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BaseToken {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Liquidity {
    #[serde(default)]
    usd: Option<f64>,
}

impl Pair {
    fn liquidity_usd(&self) -> f64 {
        self.liquidity
            .as_ref()
            .and_then(|l| l.usd)
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    /// Market cap, falling back to fully-diluted valuation.
    fn market_cap(&self) -> f64 {
        self.market_cap
            .filter(|v| *v > 0.0)
            .or(self.fdv)
            .unwrap_or(0.0)
    }
}

pub struct DexScreenerProvider {
    client: Client,
    base_url: Url,
    limiter: Arc<RateLimiter>,
}

impl DexScreenerProvider {
    pub fn new(
        client: Client,
        base_url: &str,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
            limiter,
        })
    }

    /// Parse a token-pairs payload into a reading from the highest-liquidity pair.
    ///
    /// Returns `Ok(None)` when the mint has no pairs listed.
    pub fn parse_token_pairs(body: &str) -> Result<Option<MarketCapReading>, FetchError> {
        let response: TokenPairsResponse = serde_json::from_str(body)?;
        let pairs = response.pairs.unwrap_or_default();

        // Ties keep the first pair as listed.
        let best = pairs.into_iter().reduce(|best, pair| {
            if pair.liquidity_usd() > best.liquidity_usd() {
                pair
            } else {
                best
            }
        });

        Ok(best.map(|pair| {
            let (name, symbol) = match &pair.base_token {
                Some(token) => (token.name.as_deref(), token.symbol.as_deref()),
                None => (None, None),
            };
            MarketCapReading {
                market_cap_usd: pair.market_cap(),
                name: resolve_name(name, symbol),
                source: DataSource::DexScreener,
            }
        }))
    }
}

#[async_trait]
impl MarketDataProvider for DexScreenerProvider {
    fn source(&self) -> DataSource {
        DataSource::DexScreener
    }

    async fn fetch_market_cap(&self, mint: &str) -> Result<Option<MarketCapReading>, FetchError> {
        self.limiter.acquire().await;

        let url = endpoint(&self.base_url, &["latest", "dex", "tokens"], mint)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        Self::parse_token_pairs(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highest_liquidity_pair_wins() {
        let body = r#"{
            "schemaVersion": "1.0.0",
            "pairs": [
                {"baseToken": {"name": "Shallow", "symbol": "SHL"}, "liquidity": {"usd": 1200.0}, "marketCap": 50000.0, "fdv": 51000.0},
                {"baseToken": {"name": "Deep", "symbol": "DEEP"}, "liquidity": {"usd": 98000.5}, "marketCap": 75000.0, "fdv": 80000.0},
                {"baseToken": {"name": "Middle", "symbol": "MID"}, "liquidity": {"usd": 40000.0}, "marketCap": 60000.0}
            ]
        }"#;
        let reading = DexScreenerProvider::parse_token_pairs(body).unwrap().unwrap();
        assert_eq!(reading.market_cap_usd, 75000.0);
        assert_eq!(reading.name, "Deep");
        assert_eq!(reading.source, DataSource::DexScreener);
    }

    #[test]
    fn test_missing_liquidity_ranks_lowest() {
        let body = r#"{"pairs": [
            {"baseToken": {"name": "NoLiq"}, "marketCap": 1.0},
            {"baseToken": {"name": "Liq"}, "liquidity": {"usd": 10.0}, "marketCap": 2.0}
        ]}"#;
        let reading = DexScreenerProvider::parse_token_pairs(body).unwrap().unwrap();
        assert_eq!(reading.name, "Liq");
    }

    #[test]
    fn test_equal_liquidity_keeps_first_pair() {
        let body = r#"{"pairs": [
            {"baseToken": {"name": "First"}, "liquidity": {"usd": 10.0}, "marketCap": 1.0},
            {"baseToken": {"name": "Second"}, "liquidity": {"usd": 10.0}, "marketCap": 2.0}
        ]}"#;
        let reading = DexScreenerProvider::parse_token_pairs(body).unwrap().unwrap();
        assert_eq!(reading.name, "First");
    }

    #[test]
    fn test_fdv_used_when_market_cap_absent() {
        let body = r#"{"pairs": [{"baseToken": {"symbol": "FDV"}, "liquidity": {"usd": 5.0}, "fdv": 42000.0}]}"#;
        let reading = DexScreenerProvider::parse_token_pairs(body).unwrap().unwrap();
        assert_eq!(reading.market_cap_usd, 42000.0);
        assert_eq!(reading.name, "FDV");
    }

    #[test]
    fn test_fdv_used_when_market_cap_zero() {
        let body = r#"{"pairs": [{"liquidity": {"usd": 5.0}, "marketCap": 0, "fdv": 900.0}]}"#;
        let reading = DexScreenerProvider::parse_token_pairs(body).unwrap().unwrap();
        assert_eq!(reading.market_cap_usd, 900.0);
        assert_eq!(reading.name, "Unknown");
    }

    #[test]
    fn test_no_cap_at_all_reads_zero() {
        let body = r#"{"pairs": [{"baseToken": {"name": "Ghost"}}]}"#;
        let reading = DexScreenerProvider::parse_token_pairs(body).unwrap().unwrap();
        assert_eq!(reading.market_cap_usd, 0.0);
        assert!(!reading.is_usable());
    }

    #[test]
    fn test_null_or_empty_pairs_is_no_data() {
        assert!(
            DexScreenerProvider::parse_token_pairs(r#"{"pairs": null}"#)
                .unwrap()
                .is_none()
        );
        assert!(
            DexScreenerProvider::parse_token_pairs(r#"{"pairs": []}"#)
                .unwrap()
                .is_none()
        );
        assert!(DexScreenerProvider::parse_token_pairs("{}").unwrap().is_none());
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let err = DexScreenerProvider::parse_token_pairs("<html>530</html>").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
