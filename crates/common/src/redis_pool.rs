use redis::Client;
use redis::aio::ConnectionManager;

/// Create a Redis connection manager for the scheduler's cycle lease.
pub async fn connect(redis_url: &str) -> anyhow::Result<ConnectionManager> {
    let client = Client::open(redis_url)?;
    let manager = ConnectionManager::new(client).await?;

    tracing::info!("Connected to Redis");
    Ok(manager)
}
