//! Alert scheduler: the recurring market-cap sweep.
//!
//! Each cycle:
//! 1. Snapshots every armed token from the store
//! 2. Fetches a reading per token, one at a time, pausing between fetches
//! 3. Evaluates the level-triggered threshold (via `evaluator`)
//! 4. On crossing, wins the store's Armed → Fired compare-and-set and only
//!    then dispatches the alert
//!
//! Per-token failures are counted and logged; nothing stops the loop.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::MissedTickBehavior;

use pump_common::config::AppConfig;
use pump_common::error::AppError;
use pump_common::format::format_mc;
use pump_common::types::{TrackedToken, mint_prefix};
use pump_feeds::MarketCapSource;
use pump_notifier::NotificationSink;

use crate::alert::render_alert;
use crate::evaluator::evaluate;
use crate::lease::CycleLease;
use crate::store::TokenStore;

/// Timing of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Period between cycle starts.
    pub poll_interval: Duration,
    /// Pause between two per-token fetches within one cycle.
    pub request_delay: Duration,
}

impl SchedulerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            request_delay: config.request_delay(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(20),
            request_delay: Duration::from_millis(500),
        }
    }
}

/// What happened to one armed token in one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CheckOutcome {
    /// No usable market data; retried next cycle.
    Unavailable,
    /// Evaluated, target not reached.
    Below { multiple: f64 },
    /// Target reached, state moved to Fired and the alert dispatched.
    Fired { multiple: f64 },
    /// Target reached but the token was removed, re-tracked or already fired
    /// since the snapshot; nothing was sent.
    Superseded,
}

/// Per-cycle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub armed: usize,
    pub checked: usize,
    pub fired: usize,
    pub unavailable: usize,
    pub superseded: usize,
    pub failed: usize,
}

pub struct AlertScheduler {
    store: Arc<dyn TokenStore>,
    source: Arc<dyn MarketCapSource>,
    sink: Arc<dyn NotificationSink>,
    config: SchedulerConfig,
    lease: Option<CycleLease>,
}

impl AlertScheduler {
    pub fn new(
        store: Arc<dyn TokenStore>,
        source: Arc<dyn MarketCapSource>,
        sink: Arc<dyn NotificationSink>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            source,
            sink,
            config,
            lease: None,
        }
    }

    /// Serialize cycles across processes through a shared lease.
    pub fn with_lease(mut self, lease: CycleLease) -> Self {
        tracing::info!(key = lease.key(), owner = lease.owner(), "Cycle lease enabled");
        self.lease = Some(lease);
        self
    }

    /// Run cycles forever: one immediately, then one per `poll_interval`.
    ///
    /// Each cycle is awaited before the next tick is taken, so cycles never
    /// overlap; a sweep longer than the period delays the next one.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            request_delay_ms = self.config.request_delay.as_millis() as u64,
            "Alert scheduler started"
        );

        loop {
            ticker.tick().await;
            self.guarded_cycle().await;
        }
    }

    async fn guarded_cycle(&self) {
        let Some(lease) = &self.lease else {
            self.run_cycle().await;
            return;
        };

        match lease.try_acquire().await {
            Ok(true) => {
                self.run_cycle().await;
                if let Err(e) = lease.release().await {
                    tracing::warn!(error = %e, "Failed to release cycle lease; it will expire");
                }
            }
            Ok(false) => {
                tracing::debug!("Another tracker holds the cycle lease, skipping cycle");
            }
            Err(e) => {
                // The store's compare-and-set still guarantees a single alert.
                tracing::warn!(error = %e, "Cycle lease unavailable, running cycle unguarded");
                self.run_cycle().await;
            }
        }
    }

    /// Run one full sweep over the armed tokens.
    pub async fn run_cycle(&self) -> CycleReport {
        let tokens = match self.store.list_armed().await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load armed tokens, skipping cycle");
                return CycleReport::default();
            }
        };

        let mut report = CycleReport {
            armed: tokens.len(),
            ..CycleReport::default()
        };

        if tokens.is_empty() {
            return report;
        }

        tracing::info!(armed = tokens.len(), "Checking armed tokens");

        for (i, token) in tokens.iter().enumerate() {
            if i > 0 && !self.config.request_delay.is_zero() {
                tokio::time::sleep(self.config.request_delay).await;
            }

            match self.check_token(token).await {
                Ok(CheckOutcome::Unavailable) => report.unavailable += 1,
                Ok(CheckOutcome::Below { .. }) => report.checked += 1,
                Ok(CheckOutcome::Fired { .. }) => {
                    report.checked += 1;
                    report.fired += 1;
                }
                Ok(CheckOutcome::Superseded) => {
                    report.checked += 1;
                    report.superseded += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        chat_id = token.chat_id,
                        mint = mint_prefix(&token.mint),
                        error = %e,
                        "Token check failed"
                    );
                }
            }
        }

        tracing::info!(
            armed = report.armed,
            checked = report.checked,
            fired = report.fired,
            unavailable = report.unavailable,
            superseded = report.superseded,
            failed = report.failed,
            "Tracker cycle complete"
        );

        report
    }

    /// Evaluate a single armed token and fire its alert if the target is reached.
    pub async fn check_token(&self, token: &TrackedToken) -> Result<CheckOutcome, AppError> {
        if !token.is_armed() {
            return Ok(CheckOutcome::Superseded);
        }

        let Some(reading) = self.source.fetch(&token.mint).await else {
            tracing::debug!(
                chat_id = token.chat_id,
                mint = mint_prefix(&token.mint),
                "No market data this cycle"
            );
            return Ok(CheckOutcome::Unavailable);
        };

        let Some(eval) = evaluate(token, reading.market_cap_usd) else {
            return Ok(CheckOutcome::Unavailable);
        };

        tracing::info!(
            chat_id = token.chat_id,
            name = %token.name,
            source = %reading.source,
            baseline = %format_mc(token.baseline_mc),
            current = %format_mc(eval.current_mc),
            multiple = %format!("{:.2}x", eval.current_multiple),
            "Token checked"
        );

        if !eval.crossed {
            return Ok(CheckOutcome::Below {
                multiple: eval.current_multiple,
            });
        }

        // State first: only the caller that wins the transition notifies.
        if !self.store.mark_fired(token).await? {
            tracing::info!(
                chat_id = token.chat_id,
                mint = mint_prefix(&token.mint),
                "Token changed since snapshot, alert not sent"
            );
            return Ok(CheckOutcome::Superseded);
        }

        let text = render_alert(token, &eval);
        match self.sink.notify(token.chat_id, &text).await {
            Ok(()) => tracing::info!(
                chat_id = token.chat_id,
                name = %token.name,
                multiple = %format!("{:.2}x", eval.current_multiple),
                "Alert fired"
            ),
            Err(e) => tracing::error!(
                chat_id = token.chat_id,
                name = %token.name,
                error = %e,
                "Alert fired but delivery failed"
            ),
        }

        Ok(CheckOutcome::Fired {
            multiple: eval.current_multiple,
        })
    }
}
