//! Human-readable market-cap figures shared by alerts, the bot and the API.

/// Format a USD market cap as `$1.23M`, `$45.6K` or `$789.00`.
pub fn format_mc(mc: f64) -> String {
    if !mc.is_finite() || mc == 0.0 {
        return "$0".to_string();
    }
    if mc >= 1_000_000.0 {
        format!("${:.2}M", mc / 1_000_000.0)
    } else if mc >= 1_000.0 {
        format!("${:.1}K", mc / 1_000.0)
    } else {
        format!("${:.2}", mc)
    }
}
