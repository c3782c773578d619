//! Cycle lease: Redis-backed mutual exclusion for tracker cycles.
//!
//! Inside one process cycles are already serialized by the scheduler loop.
//! When several replicas share a store, the lease keeps at most one of them
//! sweeping at a time.
//!
//! Acquire uses `SET key owner NX PX ttl`; release deletes the key only if it
//! still holds our owner token, so an expired lease taken over by another
//! replica is never released by the previous holder.

use std::time::Duration;

use redis::Script;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use pump_common::error::AppError;

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

pub struct CycleLease {
    redis: ConnectionManager,
    key: String,
    owner: String,
    ttl: Duration,
}

impl CycleLease {
    pub fn new(redis: ConnectionManager, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            redis,
            key: key.into(),
            owner: Uuid::new_v4().to_string(),
            ttl,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Try to take the lease. Returns `false` if another holder has it.
    pub async fn try_acquire(&self) -> Result<bool, AppError> {
        let mut conn = self.redis.clone();

        // Some("OK") when set, None when the key already exists
        let result: Option<String> = redis::cmd("SET")
            .arg(&self.key)
            .arg(&self.owner)
            .arg("NX")
            .arg("PX")
            .arg(self.ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;

        let acquired = result.is_some();
        if !acquired {
            tracing::debug!(key = %self.key, "Cycle lease held elsewhere");
        }
        Ok(acquired)
    }

    /// Release the lease if we still own it. Returns whether it was released.
    pub async fn release(&self) -> Result<bool, AppError> {
        let mut conn = self.redis.clone();
        let deleted: i64 = Script::new(RELEASE_SCRIPT)
            .key(&self.key)
            .arg(&self.owner)
            .invoke_async(&mut conn)
            .await?;

        Ok(deleted == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Requires a running Redis; run with `REDIS_URL=... cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn test_lease_is_exclusive_and_owner_released() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        let conn = pump_common::redis_pool::connect(&url).await.unwrap();
        let key = format!("pump:test:lease:{}", Uuid::new_v4());

        let a = CycleLease::new(conn.clone(), key.clone(), Duration::from_secs(5));
        let b = CycleLease::new(conn, key, Duration::from_secs(5));
        assert_ne!(a.owner(), b.owner());
        assert_eq!(a.key(), b.key());

        assert!(a.try_acquire().await.unwrap());
        assert!(!b.try_acquire().await.unwrap());
        // b never held it, so it cannot release it
        assert!(!b.release().await.unwrap());

        assert!(a.release().await.unwrap());
        assert!(b.try_acquire().await.unwrap());
        assert!(b.release().await.unwrap());
    }
}
