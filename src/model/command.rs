//! The command model: turns raw chat input into typed commands.
//!
//! Text messages and inline-keyboard callbacks both resolve to a `Command`.
//! The variant set is closed; payload fields exist only on the variants
//! that need them, so "which fields are valid for which command" is a
//! compile-time property.

use crate::model::Amount;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

pub const ACTION_UPDATE: &str = "UPDATE";
pub const ACTION_READ: &str = "READ";
pub const ACTION_DETAILS: &str = "DETAILS";
pub const ACTION_REMOVE: &str = "REMOVE";

/// Recognizes a normalized token (lowercased, spaces stripped) that denotes
/// a monetary amount: an optional pound sign followed by standard decimal
/// notation.
static FINANCIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^£?\d+(\.\d+)?$").expect("financial token pattern"));

/// Returns whether `token` looks like a monetary amount. The token must
/// already be normalized. Used only to disambiguate a bare amount from
/// other messages during classification; keywords always win.
pub fn is_financial(token: &str) -> bool {
    FINANCIAL.is_match(token)
}

/// What the user asked for, with per-variant payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Ping,
    List,
    Update,
    UpdateCategoryChosen { category: String },
    Amount { value: Amount },
    UpdateFull { category: String, value: Amount },
    Read,
    ReadCategoryChosen { category: String },
    Details,
    DetailsCategoryChosen { category: String },
    Remove,
    RemoveCategoryChosen { category: String },
    Help,
    Doris,
    Boobs,
    Alice,
}

/// A resolved command. Besides the action it carries the chat to answer
/// in, the message the action came from (needed to later strip that
/// message's inline keyboard), and the user id that keys the conversation
/// state store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub chat_id: i64,
    pub message_id: i32,
    pub user_id: u64,
    pub action: Action,
}

impl Command {
    fn new(action: Action, chat_id: i64, message_id: i32, user_id: u64) -> Self {
        Self {
            chat_id,
            message_id,
            user_id,
            action,
        }
    }

    /// Classifies a free-text message. The message is normalized
    /// (lowercased, spaces stripped) and matched against the fixed
    /// keywords before falling back to amount detection, so a message
    /// that is literally "update" is never treated as an amount.
    pub fn from_text(message: &str, chat_id: i64, message_id: i32, user_id: u64) -> Result<Self> {
        let norm = normalize(message);
        let action = match norm.as_str() {
            "ping" => Action::Ping,
            "list" => Action::List,
            "update" => Action::Update,
            "read" => Action::Read,
            "details" => Action::Details,
            "remove" => Action::Remove,
            "help" => Action::Help,
            "doris" => Action::Doris,
            "boobs" => Action::Boobs,
            "alice" => Action::Alice,
            token if is_financial(token) => {
                return parse_financial(token, chat_id, message_id, user_id)
            }
            _ => {
                return Err(Error::Command {
                    response: format!("{message} not a recognised command"),
                    chat_id,
                    unauthorized: false,
                })
            }
        };
        Ok(Self::new(action, chat_id, message_id, user_id))
    }

    /// Classifies an inline-keyboard callback payload. The payload is
    /// exactly two colon-separated segments, `ACTION:CATEGORY`.
    pub fn from_callback(payload: &str, chat_id: i64, message_id: i32, user_id: u64) -> Result<Self> {
        let mut split = payload.splitn(3, ':');
        let (action_tag, category) = match (split.next(), split.next(), split.next()) {
            (Some(action), Some(category), None) => (action, category.to_string()),
            _ => {
                warn!(payload, "Cannot parse callback payload");
                return Err(apology(chat_id));
            }
        };

        let action = match action_tag {
            ACTION_UPDATE => Action::UpdateCategoryChosen { category },
            ACTION_READ => Action::ReadCategoryChosen { category },
            ACTION_DETAILS => Action::DetailsCategoryChosen { category },
            ACTION_REMOVE => Action::RemoveCategoryChosen { category },
            _ => {
                warn!(payload, "Unknown callback action");
                return Err(apology(chat_id));
            }
        };
        Ok(Self::new(action, chat_id, message_id, user_id))
    }

    /// Combines a prior `UpdateCategoryChosen` with a follow-up `Amount`
    /// into an `UpdateFull`. Purely structural: the caller must guarantee
    /// the variants, mismatched inputs merge empty payload fields.
    pub fn merge_update(chosen: &Command, numeric: &Command) -> Command {
        let category = match &chosen.action {
            Action::UpdateCategoryChosen { category } => category.clone(),
            _ => String::new(),
        };
        let value = match &numeric.action {
            Action::Amount { value } => *value,
            _ => Amount::default(),
        };
        Self::new(
            Action::UpdateFull { category, value },
            chosen.chat_id,
            chosen.message_id,
            chosen.user_id,
        )
    }
}

fn normalize(message: &str) -> String {
    message.to_lowercase().replace(' ', "")
}

fn parse_financial(token: &str, chat_id: i64, message_id: i32, user_id: u64) -> Result<Command> {
    let value = Amount::from_str(token).map_err(|e| {
        warn!(token, error = %e, "Failed to parse financial amount");
        Error::Command {
            response: format!("Could not convert {token} to GBP. Please enter a valid amount"),
            chat_id,
            unauthorized: false,
        }
    })?;
    Ok(Command::new(
        Action::Amount { value },
        chat_id,
        message_id,
        user_id,
    ))
}

fn apology(chat_id: i64) -> Error {
    Error::Command {
        response: "Error, sorry...".to_string(),
        chat_id,
        unauthorized: false,
    }
}
