//! Configuration file handling.
//!
//! The configuration is a JSON file naming the users allowed to talk to
//! the bot and, for each of them, where their ledger document lives and
//! how its table is laid out. It is loaded once at startup and immutable
//! for the process lifetime. Secrets stay out of the file: the Telegram
//! token and each WebDAV password are looked up from the environment
//! variables the config names.

use crate::{utils, Result};
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
const DEFAULT_BLANK_RUN_LIMIT: u32 = 5;

/// Where one user's ledger lives and how to read it: the WebDAV base URL
/// and file path, plus the column letters and start row of the
/// category/value table inside the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSource {
    pub base_url: String,
    /// The WebDAV user, also a path segment under `base_url`.
    pub user: String,
    /// Name of the environment variable holding the WebDAV password.
    pub password_env: String,
    pub file_path: String,
    pub name_column: String,
    pub value_column: String,
    pub start_row: u32,
    /// Consecutive blank name cells that signal the end of the table.
    #[serde(default = "default_blank_run_limit")]
    pub blank_run_limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub telegram_user_id: u64,
    pub source: SheetSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Name of the environment variable holding the Telegram bot token.
    #[serde(default = "default_token_env")]
    pub telegram_token_env: String,
    pub users: Vec<User>,
}

impl Config {
    /// Loads and validates the configuration from `path`.
    pub async fn load(path: &Path) -> Result<Self> {
        let config: Config = utils::deserialize(path).await?;
        config.validate()?;
        Ok(config)
    }

    /// Whether this Telegram user may talk to the bot at all.
    pub fn is_allowed(&self, user_id: u64) -> bool {
        self.users.iter().any(|u| u.telegram_user_id == user_id)
    }

    /// The configured spreadsheet source for a user, `None` when the user
    /// is unknown.
    pub fn source_for(&self, user_id: u64) -> Option<&SheetSource> {
        self.users
            .iter()
            .find(|u| u.telegram_user_id == user_id)
            .map(|u| &u.source)
    }

    /// Resolves the bot token from the configured environment variable.
    pub fn bot_token(&self) -> Result<String> {
        std::env::var(&self.telegram_token_env)
            .with_context(|| format!("Missing env var {}", self.telegram_token_env))
            .map_err(Into::into)
    }

    fn validate(&self) -> Result<()> {
        if self.users.is_empty() {
            return Err(anyhow!("Config must name at least one user").into());
        }
        for user in &self.users {
            let source = &user.source;
            crate::ledger::column_index(&source.name_column)
                .with_context(|| format!("Bad name_column for user '{}'", user.name))?;
            crate::ledger::column_index(&source.value_column)
                .with_context(|| format!("Bad value_column for user '{}'", user.name))?;
            if source.start_row == 0 {
                return Err(anyhow!("start_row is 1-based for user '{}'", user.name).into());
            }
            if source.blank_run_limit == 0 {
                return Err(
                    anyhow!("blank_run_limit must be positive for user '{}'", user.name).into(),
                );
            }
        }
        Ok(())
    }
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

fn default_blank_run_limit() -> u32 {
    DEFAULT_BLANK_RUN_LIMIT
}
