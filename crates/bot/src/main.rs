use std::sync::Arc;

use teloxide::prelude::*;

use pump_bot::handlers;
use pump_common::config::AppConfig;
use pump_common::redis_pool;
use pump_engine::lease::CycleLease;
use pump_engine::scheduler::{AlertScheduler, SchedulerConfig};
use pump_engine::store;
use pump_engine::tracking::TrackingService;
use pump_feeds::{MarketCapSource, MarketDataFetcher};
use pump_notifier::{NotificationSink, TelegramSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pump_bot=info,pump_engine=info,pump_feeds=info".into()),
        )
        .json()
        .init();

    tracing::info!("Pump Alert bot starting...");

    // Load configuration
    let config = AppConfig::from_env()?;
    let token = config.require_telegram_token()?;

    // Token store: PostgreSQL when configured, otherwise in-memory
    let store = store::open_store(&config).await?;

    let source: Arc<dyn MarketCapSource> = Arc::new(MarketDataFetcher::from_config(&config)?);
    let tracking = Arc::new(TrackingService::new(store.clone(), source.clone()));

    let bot = Bot::new(token);
    let sink: Arc<dyn NotificationSink> = Arc::new(TelegramSink::new(bot.clone()));

    // Alert scheduler
    let mut scheduler = AlertScheduler::new(
        store,
        source,
        sink,
        SchedulerConfig::from_app_config(&config),
    );
    if let Some(url) = &config.redis_url {
        let redis = redis_pool::connect(url).await?;
        let lease = CycleLease::new(redis, config.lease_key.clone(), config.lease_ttl());
        scheduler = scheduler.with_lease(lease);
    }
    let scheduler_handle = tokio::spawn(async move { scheduler.run().await });

    tracing::info!("Listening for Telegram updates");

    // Dispatcher stops on Ctrl+C
    Dispatcher::builder(bot, handlers::schema())
        .dependencies(dptree::deps![tracking])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    scheduler_handle.abort();
    tracing::info!("Pump Alert bot stopped.");
    Ok(())
}
