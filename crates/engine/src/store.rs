//! Token store: the canonical owner of every tracked token.
//!
//! The scheduler and the foreground command path both go through
//! [`TokenStore`]. Every write is a single atomic operation on the backing
//! store, so concurrent writers never lose each other's updates.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use pump_common::config::AppConfig;
use pump_common::db;
use pump_common::error::AppError;
use pump_common::types::{AlertState, ChatId, TrackedToken};

use crate::memory::MemoryTokenStore;

/// Keyed store of tracked tokens, one set per chat.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert a token, replacing any existing entry for the same (chat, mint).
    ///
    /// Replacement is total: new id, baseline, multiplier and name, with the
    /// alert re-armed.
    async fn add_or_replace(
        &self,
        chat_id: ChatId,
        mint: &str,
        baseline_mc: f64,
        multiplier: f64,
        name: &str,
    ) -> Result<TrackedToken, AppError>;

    async fn get(&self, chat_id: ChatId, mint: &str) -> Result<Option<TrackedToken>, AppError>;

    /// Tokens of one chat, oldest first.
    async fn list_for_user(&self, chat_id: ChatId) -> Result<Vec<TrackedToken>, AppError>;

    /// Every token of every chat.
    async fn list_all(&self) -> Result<Vec<TrackedToken>, AppError>;

    /// Every token still waiting for its alert.
    async fn list_armed(&self) -> Result<Vec<TrackedToken>, AppError> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(TrackedToken::is_armed)
            .collect())
    }

    /// Compare-and-set Armed → Fired for exactly this tracking instance.
    ///
    /// Returns `true` only for the call that performed the transition. Returns
    /// `false` when the token was already fired, removed, or re-tracked (new id)
    /// since `token` was read.
    async fn mark_fired(&self, token: &TrackedToken) -> Result<bool, AppError>;

    /// Delete a token, returning the entry as it was at removal.
    async fn remove(&self, chat_id: ChatId, mint: &str) -> Result<Option<TrackedToken>, AppError>;

    /// Remove every token of a chat, returning how many were removed.
    async fn clear_user(&self, chat_id: ChatId) -> Result<u64, AppError>;
}

/// Open the configured store: PostgreSQL when `DATABASE_URL` is set,
/// otherwise a non-durable in-memory store.
pub async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn TokenStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = db::connect_and_migrate(url, config.db_max_connections).await?;
            Ok(Arc::new(PgTokenStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, tracked tokens will not survive a restart");
            Ok(Arc::new(MemoryTokenStore::new()))
        }
    }
}

/// PostgreSQL-backed store over the `tracked_tokens` table.
#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn add_or_replace(
        &self,
        chat_id: ChatId,
        mint: &str,
        baseline_mc: f64,
        multiplier: f64,
        name: &str,
    ) -> Result<TrackedToken, AppError> {
        let token: TrackedToken = sqlx::query_as(
            r#"
            INSERT INTO tracked_tokens (id, chat_id, mint, name, baseline_mc, multiplier, alert_state, added_at, fired_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NULL)
            ON CONFLICT (chat_id, mint) DO UPDATE SET
                id = EXCLUDED.id,
                name = EXCLUDED.name,
                baseline_mc = EXCLUDED.baseline_mc,
                multiplier = EXCLUDED.multiplier,
                alert_state = EXCLUDED.alert_state,
                added_at = EXCLUDED.added_at,
                fired_at = NULL
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(chat_id)
        .bind(mint)
        .bind(name)
        .bind(baseline_mc)
        .bind(multiplier)
        .bind(AlertState::Armed.to_string())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            chat_id,
            mint = %token.mint,
            baseline_mc,
            multiplier,
            "Token tracked"
        );

        Ok(token)
    }

    async fn get(&self, chat_id: ChatId, mint: &str) -> Result<Option<TrackedToken>, AppError> {
        let token = sqlx::query_as("SELECT * FROM tracked_tokens WHERE chat_id = $1 AND mint = $2")
            .bind(chat_id)
            .bind(mint)
            .fetch_optional(&self.pool)
            .await?;

        Ok(token)
    }

    async fn list_for_user(&self, chat_id: ChatId) -> Result<Vec<TrackedToken>, AppError> {
        let tokens =
            sqlx::query_as("SELECT * FROM tracked_tokens WHERE chat_id = $1 ORDER BY added_at ASC")
                .bind(chat_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(tokens)
    }

    async fn list_all(&self) -> Result<Vec<TrackedToken>, AppError> {
        let tokens = sqlx::query_as("SELECT * FROM tracked_tokens ORDER BY chat_id, added_at ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(tokens)
    }

    async fn list_armed(&self) -> Result<Vec<TrackedToken>, AppError> {
        let tokens = sqlx::query_as(
            "SELECT * FROM tracked_tokens WHERE alert_state = $1 ORDER BY chat_id, added_at ASC",
        )
        .bind(AlertState::Armed.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(tokens)
    }

    async fn mark_fired(&self, token: &TrackedToken) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE tracked_tokens
            SET alert_state = $1, fired_at = NOW()
            WHERE chat_id = $2 AND mint = $3 AND id = $4 AND alert_state = $5
            "#,
        )
        .bind(AlertState::Fired.to_string())
        .bind(token.chat_id)
        .bind(&token.mint)
        .bind(token.id)
        .bind(AlertState::Armed.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove(
        &self,
        chat_id: ChatId,
        mint: &str,
    ) -> Result<Option<TrackedToken>, AppError> {
        let removed: Option<TrackedToken> = sqlx::query_as(
            "DELETE FROM tracked_tokens WHERE chat_id = $1 AND mint = $2 RETURNING *",
        )
        .bind(chat_id)
        .bind(mint)
        .fetch_optional(&self.pool)
        .await?;

        if removed.is_some() {
            tracing::info!(chat_id, mint, "Token untracked");
        }

        Ok(removed)
    }

    async fn clear_user(&self, chat_id: ChatId) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM tracked_tokens WHERE chat_id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(chat_id, removed = result.rows_affected(), "Chat cleared");
        Ok(result.rows_affected())
    }
}
