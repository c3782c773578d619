//! In-memory token store.
//!
//! Non-durable: everything is lost on restart. Used when no database is
//! configured and throughout the test suites. A single write lock guards
//! every mutation, which is plenty for chat-driven write volume.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use pump_common::error::AppError;
use pump_common::types::{AlertState, ChatId, TrackedToken};

use crate::store::TokenStore;

#[derive(Default)]
pub struct MemoryTokenStore {
    chats: RwLock<BTreeMap<ChatId, Vec<TrackedToken>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn add_or_replace(
        &self,
        chat_id: ChatId,
        mint: &str,
        baseline_mc: f64,
        multiplier: f64,
        name: &str,
    ) -> Result<TrackedToken, AppError> {
        let token = TrackedToken::armed(chat_id, mint, baseline_mc, multiplier, name);

        let mut chats = self.chats.write().await;
        let tokens = chats.entry(chat_id).or_default();
        tokens.retain(|t| t.mint != mint);
        tokens.push(token.clone());

        tracing::info!(chat_id, mint, baseline_mc, multiplier, "Token tracked");
        Ok(token)
    }

    async fn get(&self, chat_id: ChatId, mint: &str) -> Result<Option<TrackedToken>, AppError> {
        let chats = self.chats.read().await;
        Ok(chats
            .get(&chat_id)
            .and_then(|tokens| tokens.iter().find(|t| t.mint == mint))
            .cloned())
    }

    async fn list_for_user(&self, chat_id: ChatId) -> Result<Vec<TrackedToken>, AppError> {
        let chats = self.chats.read().await;
        Ok(chats.get(&chat_id).cloned().unwrap_or_default())
    }

    async fn list_all(&self) -> Result<Vec<TrackedToken>, AppError> {
        let chats = self.chats.read().await;
        Ok(chats.values().flatten().cloned().collect())
    }

    async fn mark_fired(&self, token: &TrackedToken) -> Result<bool, AppError> {
        let mut chats = self.chats.write().await;
        let stored = chats
            .get_mut(&token.chat_id)
            .and_then(|tokens| tokens.iter_mut().find(|t| t.mint == token.mint));

        match stored {
            Some(stored) if stored.id == token.id && stored.alert_state == AlertState::Armed => {
                stored.alert_state = AlertState::Fired;
                stored.fired_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove(
        &self,
        chat_id: ChatId,
        mint: &str,
    ) -> Result<Option<TrackedToken>, AppError> {
        let mut chats = self.chats.write().await;
        let Some(tokens) = chats.get_mut(&chat_id) else {
            return Ok(None);
        };

        let removed = tokens
            .iter()
            .position(|t| t.mint == mint)
            .map(|index| tokens.remove(index));
        if tokens.is_empty() {
            chats.remove(&chat_id);
        }

        if removed.is_some() {
            tracing::info!(chat_id, mint, "Token untracked");
        }
        Ok(removed)
    }

    async fn clear_user(&self, chat_id: ChatId) -> Result<u64, AppError> {
        let removed = self
            .chats
            .write()
            .await
            .remove(&chat_id)
            .map(|tokens| tokens.len() as u64)
            .unwrap_or(0);

        tracing::info!(chat_id, removed, "Chat cleared");
        Ok(removed)
    }
}
