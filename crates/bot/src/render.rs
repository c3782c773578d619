//! Chat message texts. Everything here is HTML for `ParseMode::Html`.

use pump_common::error::AppError;
use pump_common::format::format_mc;
use pump_common::types::TrackedToken;
use pump_engine::tracking::{TokenStatus, TrackOutcome};
use pump_notifier::escape_html;

pub fn welcome() -> String {
    "🚀 <b>Pump Token Tracker</b>\n\n\
     Get pinged once when a token's market cap hits your target.\n\n\
     <b>Commands</b>\n\
     /track &lt;CA&gt; &lt;multiplier&gt; - start tracking\n\
     /list - tracked tokens with live market caps\n\
     /untrack &lt;CA&gt; - stop tracking a token\n\
     /clear - stop tracking everything\n\n\
     <b>Example</b>\n\
     <code>/track 7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr 3</code>\n\
     alerts you when the market cap triples."
        .to_string()
}

pub fn track_usage() -> String {
    "Usage: <code>/track &lt;CA&gt; &lt;multiplier&gt;</code>\n\
     Example: <code>/track 7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr 3</code>"
        .to_string()
}

pub fn untrack_usage() -> String {
    "Usage: <code>/untrack &lt;CA&gt;</code>".to_string()
}

pub fn fetching(mint: &str) -> String {
    format!("🔍 Fetching market cap for <code>{}</code>...", escape_html(mint))
}

pub fn tracking_started(outcome: &TrackOutcome) -> String {
    let token = &outcome.token;
    let mut text = format!(
        "✅ <b>Now tracking {name}</b>\n\n\
         📊 Current MC: <b>{baseline}</b>\n\
         🎯 Alert at: <b>{multiplier}x</b> ({target})\n\
         🔗 <code>{mint}</code>",
        name = escape_html(&token.name),
        baseline = format_mc(token.baseline_mc),
        multiplier = token.multiplier,
        target = format_mc(token.target_mc()),
        mint = escape_html(&token.mint),
    );
    if let Some(previous) = &outcome.previous {
        text.push_str(&format!(
            "\n\n♻️ Replaced the previous {}x alert from {}.",
            previous.multiplier,
            format_mc(previous.baseline_mc)
        ));
    }
    text
}

pub fn list_header(count: usize) -> String {
    format!("📋 <b>Tracking {} token(s)</b>", count)
}

pub fn empty_list() -> String {
    "You're not tracking any tokens yet.\nUse /track &lt;CA&gt; &lt;multiplier&gt; to start."
        .to_string()
}

/// One `/list` entry.
pub fn token_status(status: &TokenStatus) -> String {
    let token = &status.token;
    let mut text = format!(
        "🪙 <b>{name}</b>\n\
         <code>{mint}</code>\n\n\
         📊 Baseline MC: {baseline}\n\
         🎯 Target: {multiplier}x ({target})",
        name = escape_html(&token.name),
        mint = escape_html(&token.mint),
        baseline = format_mc(token.baseline_mc),
        multiplier = token.multiplier,
        target = format_mc(token.target_mc()),
    );

    match &status.live {
        Some(live) => {
            let sign = if live.gain_pct >= 0.0 { "+" } else { "" };
            text.push_str(&format!(
                "\n📈 Current MC: <b>{current}</b> ({sign}{gain:.1}%)",
                current = format_mc(live.current_mc),
                gain = live.gain_pct,
            ));
            if token.is_armed() && !live.crossed {
                text.push_str(&format!(
                    "\n⏳ Needs {:.2}x from current",
                    live.needed_multiple
                ));
            }
        }
        None => text.push_str("\n⚠️ Could not fetch live data"),
    }

    if token.alert_fired() {
        text.push_str("\n✅ Alert already sent");
    }

    text
}

pub fn untrack_button_label(token: &TrackedToken) -> String {
    format!("❌ Untrack {}", token.name)
}

pub fn untracked(token: &TrackedToken) -> String {
    format!("🗑 <b>{}</b> has been untracked", escape_html(&token.name))
}

pub fn not_tracked() -> String {
    "That token isn't being tracked.".to_string()
}

pub fn cleared(count: u64) -> String {
    if count == 0 {
        "Nothing to clear, you weren't tracking any tokens.".to_string()
    } else {
        format!("🧹 Stopped tracking {} token(s).", count)
    }
}

pub fn mint_hint(mint: &str) -> String {
    format!(
        "Looks like a contract address! To track it:\n<code>/track {} 3</code>",
        escape_html(mint.trim())
    )
}

/// User-facing text for a failed request.
pub fn error(err: &AppError) -> String {
    match err {
        AppError::Validation(msg) => format!("❌ {}", escape_html(msg)),
        AppError::Upstream(_) => {
            "❌ Could not fetch market cap. Check the contract address and try again.".to_string()
        }
        _ => "❌ Something went wrong, please try again later.".to_string(),
    }
}
