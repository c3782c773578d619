//! pump.fun frontend API client: fallback provider for bonding-curve tokens
//! that DexScreener has not indexed yet.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use pump_common::types::{DataSource, MarketCapReading};

use crate::rate_limit::RateLimiter;
use crate::{FetchError, MarketDataProvider, endpoint, parse_base_url, resolve_name};

#[derive(Debug, Deserialize)]
struct Coin {
    #[serde(default)]
    usd_market_cap: Option<f64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
}

pub struct PumpFunProvider {
    client: Client,
    base_url: Url,
    limiter: Arc<RateLimiter>,
}

impl PumpFunProvider {
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

    pub fn parse_coin(body: &str) -> Result<Option<MarketCapReading>, FetchError> {
        let coin: Coin = serde_json::from_str(body)?;
        Ok(Some(MarketCapReading {
            market_cap_usd: coin.usd_market_cap.unwrap_or(0.0),
            name: resolve_name(coin.name.as_deref(), coin.symbol.as_deref()),
            source: DataSource::PumpFun,
        }))
    }
}

#[async_trait]
impl MarketDataProvider for PumpFunProvider {
    fn source(&self) -> DataSource {
        DataSource::PumpFun
    }

    async fn fetch_market_cap(&self, mint: &str) -> Result<Option<MarketCapReading>, FetchError> {
        self.limiter.acquire().await;

        let url = endpoint(&self.base_url, &["coins"], mint)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        Self::parse_coin(&body)
    }
}
