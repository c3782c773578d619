use teloxide::utils::command::BotCommands;

/// Prefix of the inline "untrack" button payload.
const UNTRACK_PREFIX: &str = "untrack:";

/// Bot commands.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Show the welcome message")]
    Start,
    #[command(description = "Track a token. Usage: /track <CA> <multiplier>")]
    Track(String),
    #[command(description = "Show tracked tokens with live market caps")]
    List,
    #[command(description = "Stop tracking a token. Usage: /untrack <CA>")]
    Untrack(String),
    #[command(description = "Stop tracking every token")]
    Clear,
    #[command(description = "Show help")]
    Help,
}

/// Arguments of `/track`, as typed by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackArgs {
    pub mint: String,
    pub multiplier: f64,
}

/// Split `/track` arguments into a mint and a multiplier.
///
/// Only the shape is checked here; the tracking service validates values.
/// An optional trailing `x` on the multiplier is accepted (`3x`).
pub fn parse_track_args(args: &str) -> Option<TrackArgs> {
    let mut parts = args.split_whitespace();
    let mint = parts.next()?;
    let raw = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let raw = raw.strip_suffix(['x', 'X']).unwrap_or(raw);
    let multiplier = raw.parse::<f64>().ok()?;

    Some(TrackArgs {
        mint: mint.to_string(),
        multiplier,
    })
}

pub fn untrack_callback_data(mint: &str) -> String {
    format!("{}{}", UNTRACK_PREFIX, mint)
}

/// The mint carried by an untrack button, if `data` is one.
pub fn parse_untrack_callback(data: &str) -> Option<&str> {
    data.strip_prefix(UNTRACK_PREFIX).filter(|mint| !mint.is_empty())
}
