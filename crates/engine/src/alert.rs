//! Alert message rendering.

use pump_common::format::format_mc;
use pump_common::types::TrackedToken;
use pump_notifier::escape_html;

use crate::evaluator::Evaluation;

/// Emoji intensity scaled by the achieved multiple.
pub fn heat(multiple: f64) -> &'static str {
    if multiple >= 5.0 {
        "🔥🔥🔥"
    } else if multiple >= 3.0 {
        "🔥🔥"
    } else if multiple >= 2.0 {
        "🚀🚀"
    } else {
        "🚀"
    }
}

/// Render the one-time alert for a token whose target was reached.
pub fn render_alert(token: &TrackedToken, eval: &Evaluation) -> String {
    format!(
        "{heat} <b>ALERT: {name}</b>\n\n\
         ✅ Target hit: <b>{target}x</b>\n\n\
         📊 Baseline MC: {baseline}\n\
         📈 Current MC: <b>{current}</b>\n\
         💹 Actual gain: <b>{multiple:.2}x ({gain:.0}%)</b>\n\n\
         🔗 <code>{mint}</code>",
        heat = heat(eval.current_multiple),
        name = escape_html(&token.name),
        target = token.multiplier,
        baseline = format_mc(token.baseline_mc),
        current = format_mc(eval.current_mc),
        multiple = eval.current_multiple,
        gain = eval.gain_pct,
        mint = escape_html(&token.mint),
    )
}
