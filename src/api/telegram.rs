//! Telegram transport: the `Messenger` implementation and the long-poll
//! update loop that feeds inbound messages and button presses to the
//! dispatcher.

use crate::api::Messenger;
use crate::model::{Entry, InboundEvent, Payload};
use crate::Result;
use anyhow::Context;
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId};
use teloxide::{dptree, RequestError};
use tracing::{debug, error, info, warn};

const BUTTONS_PER_ROW: usize = 3;

pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .context("Failed to send message")?;
        Ok(())
    }

    async fn send_entries(&self, chat_id: i64, entries: &[Entry]) -> Result<()> {
        let lines: Vec<String> = entries.iter().map(ToString::to_string).collect();
        self.send_text(chat_id, &lines.join("\n")).await
    }

    async fn send_category_picker(
        &self,
        chat_id: i64,
        entries: &[Entry],
        action: &str,
    ) -> Result<()> {
        self.bot
            .send_message(ChatId(chat_id), "Please choose a category:")
            .reply_markup(InlineKeyboardMarkup::new(picker_rows(entries, action)))
            .await
            .context("Failed to send category keyboard")?;
        Ok(())
    }

    async fn clear_markup(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.bot
            .edit_message_reply_markup(ChatId(chat_id), MessageId(message_id))
            .reply_markup(InlineKeyboardMarkup::new(
                Vec::<Vec<InlineKeyboardButton>>::new(),
            ))
            .await
            .context("Failed to clear keyboard")?;
        Ok(())
    }
}

/// Lays the category buttons out in rows of [`BUTTONS_PER_ROW`], keeping
/// the short final row. The callback payload is `{action}:{category}`.
fn picker_rows(entries: &[Entry], action: &str) -> Vec<Vec<InlineKeyboardButton>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    for entry in entries {
        row.push(InlineKeyboardButton::callback(
            entry.category.clone(),
            format!("{action}:{}", entry.category),
        ));
        if row.len() == BUTTONS_PER_ROW {
            rows.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }
    rows
}

/// Runs the long-poll loop until ctrl-c. Any webhook left over from a
/// previous deployment is dropped first, otherwise polling gets nothing.
pub async fn run(bot: Bot, dispatcher: Arc<crate::dispatch::Dispatcher>) {
    if let Err(e) = bot.delete_webhook().drop_pending_updates(true).await {
        warn!(error = %e, "Failed to clear webhook before polling");
    }

    info!("Starting Telegram long-poll loop");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(message_handler))
        .branch(Update::filter_callback_query().endpoint(callback_handler));

    teloxide::dispatching::Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher])
        .default_handler(|update| async move {
            debug!(?update, "Unhandled update kind");
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "Error in update handler",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn message_handler(
    msg: Message,
    dispatcher: Arc<crate::dispatch::Dispatcher>,
) -> std::result::Result<(), RequestError> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };

    let event = InboundEvent {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        user_id: from.id.0,
        payload: Payload::Text(text.to_string()),
    };
    if let Err(e) = dispatcher.handle(event).await {
        error!(error = %e, "Message handling failed");
    }
    Ok(())
}

async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    dispatcher: Arc<crate::dispatch::Dispatcher>,
) -> std::result::Result<(), RequestError> {
    // Telegram keeps the button spinner up until the query is answered.
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(data) = q.data.clone() else {
        return Ok(());
    };
    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };

    let event = InboundEvent {
        chat_id: message.chat().id.0,
        message_id: message.id().0,
        user_id: q.from.id.0,
        payload: Payload::Callback(data),
    };
    if let Err(e) = dispatcher.handle(event).await {
        error!(error = %e, "Callback handling failed");
    }
    Ok(())
}
