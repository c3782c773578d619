//! Token-bucket limiter bounding the request rate to a single upstream.
//!
//! Every provider owns one bucket, so the contract of "no more than ~N requests
//! per second to any single upstream" holds regardless of who is calling
//! (the scheduler sweep or a foreground status request).

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Async token bucket. `acquire` waits until a token is available.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Bucket refilling at `refill_per_sec` tokens per second, holding at most `burst` tokens.
    pub fn new(refill_per_sec: f64, burst: u32) -> Self {
        let capacity = f64::from(burst.max(1));
        Self {
            capacity,
            refill_per_sec,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Bucket whose burst equals one second's worth of requests.
    pub fn per_second(rate: f64) -> Self {
        Self::new(rate, rate.ceil().max(1.0) as u32)
    }

    /// Wait for and consume one token.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
                bucket.last_refill = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.refill_per_sec)
            };

            tracing::debug!(
                wait_ms = wait.as_millis() as u64,
                "Upstream rate limit reached, waiting"
            );
            tokio::time::sleep(wait).await;
        }
    }
}
