//! Telegram update handlers.
//!
//! Commands, inline "untrack" buttons and bare contract-address pastes are
//! routed here by the dispatcher. Handlers only talk to [`TrackingService`];
//! failures of the service are turned into chat replies, while Telegram
//! request errors bubble up to the dispatcher's error handler.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::command::BotCommands;

use pump_common::types::mint_prefix;
use pump_engine::tracking::{TrackingService, looks_like_mint};

use crate::commands::{Command, parse_track_args, parse_untrack_callback, untrack_callback_data};
use crate::render;

/// Build the dispatcher's handler tree.
pub fn schema() -> teloxide::dispatching::UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(Update::filter_message().endpoint(handle_text))
        .branch(Update::filter_callback_query().endpoint(handle_callback))
}

async fn reply(bot: &Bot, chat_id: ChatId, text: String) -> ResponseResult<Message> {
    bot.send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    tracking: Arc<TrackingService>,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;

    match cmd {
        Command::Start => {
            reply(&bot, chat_id, render::welcome()).await?;
        }

        Command::Help => {
            let text = format!(
                "{}\n\n{}",
                render::welcome(),
                teloxide::utils::html::escape(&Command::descriptions().to_string())
            );
            reply(&bot, chat_id, text).await?;
        }

        Command::Track(args) => {
            let Some(args) = parse_track_args(&args) else {
                reply(&bot, chat_id, render::track_usage()).await?;
                return Ok(());
            };

            reply(&bot, chat_id, render::fetching(&args.mint)).await?;

            let text = match tracking.track(chat_id.0, &args.mint, args.multiplier).await {
                Ok(outcome) => render::tracking_started(&outcome),
                Err(e) => {
                    tracing::warn!(
                        chat_id = chat_id.0,
                        mint = mint_prefix(args.mint.trim()),
                        error = %e,
                        "Track request failed"
                    );
                    render::error(&e)
                }
            };
            reply(&bot, chat_id, text).await?;
        }

        Command::List => {
            let statuses = match tracking.status(chat_id.0).await {
                Ok(statuses) => statuses,
                Err(e) => {
                    tracing::error!(chat_id = chat_id.0, error = %e, "Failed to list tokens");
                    reply(&bot, chat_id, render::error(&e)).await?;
                    return Ok(());
                }
            };

            if statuses.is_empty() {
                reply(&bot, chat_id, render::empty_list()).await?;
                return Ok(());
            }

            reply(&bot, chat_id, render::list_header(statuses.len())).await?;
            for status in &statuses {
                let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                    render::untrack_button_label(&status.token),
                    untrack_callback_data(&status.token.mint),
                )]]);
                bot.send_message(chat_id, render::token_status(status))
                    .parse_mode(ParseMode::Html)
                    .reply_markup(keyboard)
                    .await?;
            }
        }

        Command::Untrack(mint) => {
            let mint = mint.trim();
            if mint.is_empty() {
                reply(&bot, chat_id, render::untrack_usage()).await?;
                return Ok(());
            }

            let text = match tracking.untrack(chat_id.0, mint).await {
                Ok(Some(token)) => render::untracked(&token),
                Ok(None) => render::not_tracked(),
                Err(e) => render::error(&e),
            };
            reply(&bot, chat_id, text).await?;
        }

        Command::Clear => {
            let text = match tracking.clear(chat_id.0).await {
                Ok(count) => render::cleared(count),
                Err(e) => render::error(&e),
            };
            reply(&bot, chat_id, text).await?;
        }
    }

    Ok(())
}

/// Plain messages: hint at `/track` when the user pasted a bare address.
pub async fn handle_text(bot: Bot, msg: Message) -> ResponseResult<()> {
    if let Some(text) = msg.text()
        && looks_like_mint(text)
    {
        reply(&bot, msg.chat.id, render::mint_hint(text)).await?;
    }
    Ok(())
}

/// Inline "untrack" buttons under `/list` entries.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    tracking: Arc<TrackingService>,
) -> ResponseResult<()> {
    let Some(mint) = q.data.as_deref().and_then(parse_untrack_callback) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    let Some(message) = q.regular_message() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let chat_id = message.chat.id;

    let (text, notice) = match tracking.untrack(chat_id.0, mint).await {
        Ok(Some(token)) => (render::untracked(&token), "Untracked"),
        Ok(None) => (render::not_tracked(), "Not tracked"),
        Err(e) => {
            tracing::error!(chat_id = chat_id.0, error = %e, "Untrack from button failed");
            bot.answer_callback_query(q.id.clone())
                .text("Something went wrong")
                .await?;
            return Ok(());
        }
    };

    bot.edit_message_text(chat_id, message.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    bot.answer_callback_query(q.id.clone()).text(notice).await?;

    Ok(())
}
