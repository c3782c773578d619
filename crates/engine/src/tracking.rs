//! Tracking service: the foreground path for chat commands and the API.
//!
//! Creates, lists, reports on and removes tracked tokens. The only writes it
//! performs are whole-entry upserts and deletions; the fired flag belongs to
//! the scheduler.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;

use pump_common::error::AppError;
use pump_common::types::{ChatId, TrackedToken, mint_prefix};
use pump_feeds::MarketCapSource;

use crate::evaluator::{Evaluation, evaluate};
use crate::store::TokenStore;

/// Accepted mint length after trimming.
const MINT_MIN_LEN: usize = 32;
const MINT_MAX_LEN: usize = 50;

/// Base58 address, as typically pasted into a chat.
static MINT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").expect("mint pattern is a valid regex")
});

/// Result of a track request.
#[derive(Debug, Clone, Serialize)]
pub struct TrackOutcome {
    pub token: TrackedToken,
    /// The entry this request replaced, if the mint was already tracked.
    pub previous: Option<TrackedToken>,
}

/// A stored token together with a live reading, when one could be fetched.
#[derive(Debug, Clone, Serialize)]
pub struct TokenStatus {
    pub token: TrackedToken,
    /// `None` means live data is unavailable right now.
    pub live: Option<Evaluation>,
}

pub struct TrackingService {
    store: Arc<dyn TokenStore>,
    source: Arc<dyn MarketCapSource>,
}

impl TrackingService {
    pub fn new(store: Arc<dyn TokenStore>, source: Arc<dyn MarketCapSource>) -> Self {
        Self { store, source }
    }

    /// Start (or restart) tracking `mint` for a chat at the current market cap.
    pub async fn track(
        &self,
        chat_id: ChatId,
        mint: &str,
        multiplier: f64,
    ) -> Result<TrackOutcome, AppError> {
        let multiplier = validate_multiplier(multiplier)?;
        let mint = validate_mint(mint)?;

        let reading = self.source.fetch(mint).await.ok_or_else(|| {
            AppError::Upstream(format!(
                "could not fetch market cap for {}",
                mint_prefix(mint)
            ))
        })?;

        let previous = self.store.get(chat_id, mint).await?;
        let token = self
            .store
            .add_or_replace(
                chat_id,
                mint,
                reading.market_cap_usd,
                multiplier,
                &reading.name,
            )
            .await?;

        if previous.is_some() {
            tracing::info!(chat_id, mint = mint_prefix(mint), "Existing tracking replaced");
        }

        Ok(TrackOutcome { token, previous })
    }

    pub async fn list(&self, chat_id: ChatId) -> Result<Vec<TrackedToken>, AppError> {
        self.store.list_for_user(chat_id).await
    }

    /// Every token of a chat with live figures, fetched one after another.
    pub async fn status(&self, chat_id: ChatId) -> Result<Vec<TokenStatus>, AppError> {
        let tokens = self.store.list_for_user(chat_id).await?;
        let mut statuses = Vec::with_capacity(tokens.len());
        for token in tokens {
            statuses.push(self.token_status(token).await);
        }
        Ok(statuses)
    }

    pub async fn token_status(&self, token: TrackedToken) -> TokenStatus {
        let live = match self.source.fetch(&token.mint).await {
            Some(reading) => evaluate(&token, reading.market_cap_usd),
            None => None,
        };
        TokenStatus { token, live }
    }

    /// Stop tracking a mint, returning the removed entry.
    pub async fn untrack(
        &self,
        chat_id: ChatId,
        mint: &str,
    ) -> Result<Option<TrackedToken>, AppError> {
        self.store.remove(chat_id, mint).await
    }

    pub async fn clear(&self, chat_id: ChatId) -> Result<u64, AppError> {
        self.store.clear_user(chat_id).await
    }
}

pub fn validate_multiplier(multiplier: f64) -> Result<f64, AppError> {
    if multiplier.is_finite() && multiplier > 1.0 {
        Ok(multiplier)
    } else {
        Err(AppError::Validation(
            "Multiplier must be greater than 1 (e.g. 1.5, 2, 3, 5)".to_string(),
        ))
    }
}

pub fn validate_mint(mint: &str) -> Result<&str, AppError> {
    let mint = mint.trim();
    let len = mint.chars().count();
    if (MINT_MIN_LEN..=MINT_MAX_LEN).contains(&len) && !mint.contains(char::is_whitespace) {
        Ok(mint)
    } else {
        Err(AppError::Validation(
            "That doesn't look like a valid Solana contract address".to_string(),
        ))
    }
}

/// Whether a free-form message is just a pasted contract address.
pub fn looks_like_mint(text: &str) -> bool {
    MINT_PATTERN.is_match(text.trim())
}
