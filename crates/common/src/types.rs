use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of the chat (user) that owns a tracking set.
pub type ChatId = i64;

/// Placeholder used when neither a name nor a symbol is known.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Alert lifecycle of a tracked token.
///
/// `Armed` is the only state the scheduler evaluates. `Fired` is terminal:
/// the token stays visible for status queries but is never re-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Armed,
    Fired,
}

impl std::fmt::Display for AlertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertState::Armed => write!(f, "armed"),
            AlertState::Fired => write!(f, "fired"),
        }
    }
}

/// Upstream market data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    DexScreener,
    PumpFun,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::DexScreener => write!(f, "dexscreener"),
            DataSource::PumpFun => write!(f, "pumpfun"),
        }
    }
}

/// A single market-cap observation for a mint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketCapReading {
    pub market_cap_usd: f64,
    pub name: String,
    pub source: DataSource,
}

impl MarketCapReading {
    /// A reading is usable only when it carries a strictly positive market cap.
    pub fn is_usable(&self) -> bool {
        self.market_cap_usd.is_finite() && self.market_cap_usd > 0.0
    }
}

/// One (chat, mint) tracking instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrackedToken {
    /// Identity of this tracking instance; a re-track produces a new id.
    pub id: Uuid,
    pub chat_id: ChatId,
    pub mint: String,
    pub name: String,
    /// Market cap in USD when tracking started.
    pub baseline_mc: f64,
    /// Target ratio over the baseline, always > 1.
    pub multiplier: f64,
    pub alert_state: AlertState,
    pub added_at: DateTime<Utc>,
    pub fired_at: Option<DateTime<Utc>>,
}

impl TrackedToken {
    /// Build a freshly armed token.
    pub fn armed(chat_id: ChatId, mint: &str, baseline_mc: f64, multiplier: f64, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id,
            mint: mint.to_string(),
            name: name.to_string(),
            baseline_mc,
            multiplier,
            alert_state: AlertState::Armed,
            added_at: Utc::now(),
            fired_at: None,
        }
    }

    pub fn alert_fired(&self) -> bool {
        self.alert_state == AlertState::Fired
    }

    pub fn is_armed(&self) -> bool {
        self.alert_state == AlertState::Armed
    }

    /// Market cap at which the alert fires.
    pub fn target_mc(&self) -> f64 {
        self.baseline_mc * self.multiplier
    }

    /// `ABCDEFGH...uvwxyz` form of the mint for compact display.
    pub fn short_mint(&self) -> String {
        shorten_mint(&self.mint)
    }
}

/// Shorten a mint to its first 8 and last 6 characters.
pub fn shorten_mint(mint: &str) -> String {
    let chars: Vec<char> = mint.chars().collect();
    if chars.len() <= 14 {
        return mint.to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{}...{}", head, tail)
}

/// First 8 characters of a mint, used in log lines.
pub fn mint_prefix(mint: &str) -> &str {
    match mint.char_indices().nth(8) {
        Some((idx, _)) => &mint[..idx],
        None => mint,
    }
}
