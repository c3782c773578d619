//! Integration tests for the market data providers over real HTTP.
//!
//! Each test starts a local TCP server that answers every request with a
//! canned response, then points the real DexScreener / pump.fun clients at it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use pump_common::types::DataSource;
use pump_feeds::dexscreener::DexScreenerProvider;
use pump_feeds::pumpfun::PumpFunProvider;
use pump_feeds::rate_limit::RateLimiter;
use pump_feeds::{FetchError, MarketCapSource, MarketDataFetcher, MarketDataProvider};

const MINT: &str = "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr";

const PUMP_COIN: &str = r#"{"name": "Pumpy", "symbol": "PMP", "usd_market_cap": 1234.0}"#;

const DEX_PAIRS: &str = r#"{"pairs": [
    {"baseToken": {"name": "Deep"}, "liquidity": {"usd": 900.0}, "marketCap": 75000.0}
]}"#;

// ============================================================
// Shared helpers
// ============================================================

#[derive(Clone, Copy)]
enum Canned {
    Status(u16),
    /// Accept the request and never answer.
    Hang,
    Json(&'static str),
}

/// A running canned-response server: its base URL and the request paths it saw.
struct Upstream {
    base_url: String,
    paths: Arc<Mutex<Vec<String>>>,
}

impl Upstream {
    async fn paths(&self) -> Vec<String> {
        self.paths.lock().await.clone()
    }
}

async fn serve(reply: Canned) -> Upstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let paths = Arc::new(Mutex::new(Vec::new()));

    let seen = paths.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let seen = seen.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                if let Some(path) = request.split_whitespace().nth(1) {
                    seen.lock().await.push(path.to_string());
                }

                let response = match reply {
                    Canned::Status(code) => format!(
                        "HTTP/1.1 {} Upstream Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                        code
                    ),
                    Canned::Hang => {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        return;
                    }
                    Canned::Json(body) => format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    ),
                };
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    Upstream {
        base_url: format!("http://{}", addr),
        paths,
    }
}

fn client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap()
}

fn limiter() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::per_second(100.0))
}

fn make_fetcher(dex: &Upstream, pump: &Upstream, timeout: Duration) -> MarketDataFetcher {
    let client = client(timeout);
    MarketDataFetcher::with_providers(vec![
        Box::new(DexScreenerProvider::new(client.clone(), &dex.base_url, limiter()).unwrap()),
        Box::new(PumpFunProvider::new(client, &pump.base_url, limiter()).unwrap()),
    ])
}

// ============================================================
// Single provider
// ============================================================

#[tokio::test]
async fn test_non_success_status_is_status_error() {
    let dex = serve(Canned::Status(530)).await;
    let client = client(Duration::from_secs(5));
    let provider = DexScreenerProvider::new(client, &dex.base_url, limiter()).unwrap();

    let err = provider.fetch_market_cap(MINT).await.unwrap_err();
    match err {
        FetchError::Status(status) => assert_eq!(status, StatusCode::from_u16(530).unwrap()),
        other => panic!("expected status error, got {other:?}"),
    }
    assert_eq!(dex.paths().await, vec![format!("/latest/dex/tokens/{}", MINT)]);
}

#[tokio::test]
async fn test_pumpfun_reads_coin() {
    let pump = serve(Canned::Json(PUMP_COIN)).await;
    let provider =
        PumpFunProvider::new(client(Duration::from_secs(5)), &pump.base_url, limiter()).unwrap();

    let reading = provider.fetch_market_cap(MINT).await.unwrap().unwrap();
    assert_eq!(reading.market_cap_usd, 1234.0);
    assert_eq!(reading.name, "Pumpy");
    assert_eq!(pump.paths().await, vec![format!("/coins/{}", MINT)]);
}

#[tokio::test]
async fn test_mint_is_sent_as_one_path_segment() {
    let pump = serve(Canned::Json(PUMP_COIN)).await;
    let provider =
        PumpFunProvider::new(client(Duration::from_secs(5)), &pump.base_url, limiter()).unwrap();

    provider.fetch_market_cap("a/b?c#d").await.unwrap();
    assert_eq!(pump.paths().await, vec!["/coins/a%2Fb%3Fc%23d".to_string()]);
}

// ============================================================
// Fallback across providers
// ============================================================

#[tokio::test]
async fn test_primary_success_skips_fallback() {
    let dex = serve(Canned::Json(DEX_PAIRS)).await;
    let pump = serve(Canned::Json(PUMP_COIN)).await;
    let fetcher = make_fetcher(&dex, &pump, Duration::from_secs(5));

    let reading = fetcher.fetch(MINT).await.unwrap();
    assert_eq!(reading.source, DataSource::DexScreener);
    assert_eq!(reading.market_cap_usd, 75000.0);
    assert!(pump.paths().await.is_empty());
}

#[tokio::test]
async fn test_primary_error_status_falls_back() {
    let dex = serve(Canned::Status(530)).await;
    let pump = serve(Canned::Json(PUMP_COIN)).await;
    let fetcher = make_fetcher(&dex, &pump, Duration::from_secs(5));

    let reading = fetcher.fetch(MINT).await.unwrap();
    assert_eq!(reading.source, DataSource::PumpFun);
    assert_eq!(reading.market_cap_usd, 1234.0);
    assert_eq!(dex.paths().await.len(), 1);
}

#[tokio::test]
async fn test_primary_timeout_falls_back() {
    let dex = serve(Canned::Hang).await;
    let pump = serve(Canned::Json(PUMP_COIN)).await;
    let fetcher = make_fetcher(&dex, &pump, Duration::from_millis(300));

    let start = Instant::now();
    let reading = fetcher.fetch(MINT).await.unwrap();

    assert_eq!(reading.source, DataSource::PumpFun);
    assert!(start.elapsed() >= Duration::from_millis(300));
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_primary_unlisted_falls_back() {
    let dex = serve(Canned::Json(r#"{"pairs": null}"#)).await;
    let pump = serve(Canned::Json(PUMP_COIN)).await;
    let fetcher = make_fetcher(&dex, &pump, Duration::from_secs(5));

    assert_eq!(fetcher.fetch(MINT).await.unwrap().source, DataSource::PumpFun);
}

#[tokio::test]
async fn test_both_failing_is_none() {
    let dex = serve(Canned::Status(500)).await;
    let pump = serve(Canned::Status(404)).await;
    let fetcher = make_fetcher(&dex, &pump, Duration::from_secs(5));

    assert!(fetcher.fetch(MINT).await.is_none());
    assert_eq!(dex.paths().await.len(), 1);
    assert_eq!(pump.paths().await.len(), 1);
}
