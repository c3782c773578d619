//! Threshold evaluation of a market-cap reading against a tracked token.
//!
//! The rule is a level-triggered `current / baseline >= multiplier`,
//! evaluated fresh on every reading with no hysteresis. Repeat alerts are
//! prevented solely by the fire-once state in the store.

use serde::Serialize;

use pump_common::types::TrackedToken;

/// Result of comparing one reading against a token's target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub current_mc: f64,
    /// `current_mc / baseline_mc`
    pub current_multiple: f64,
    /// Gain over the baseline in percent (negative when below baseline).
    pub gain_pct: f64,
    /// Market cap at which the alert fires.
    pub target_mc: f64,
    /// Multiple still needed from the current market cap to reach the target.
    pub needed_multiple: f64,
    pub crossed: bool,
}

/// Evaluate `current_mc` against the token's baseline and multiplier.
///
/// Returns `None` when either figure is not a positive number, in which case
/// no decision can be made.
pub fn evaluate(token: &TrackedToken, current_mc: f64) -> Option<Evaluation> {
    if !(token.baseline_mc.is_finite() && token.baseline_mc > 0.0) {
        return None;
    }
    if !(current_mc.is_finite() && current_mc > 0.0) {
        return None;
    }

    let current_multiple = current_mc / token.baseline_mc;
    let target_mc = token.target_mc();

    Some(Evaluation {
        current_mc,
        current_multiple,
        gain_pct: (current_multiple - 1.0) * 100.0,
        target_mc,
        needed_multiple: target_mc / current_mc,
        crossed: current_multiple >= token.multiplier,
    })
}
