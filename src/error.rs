//! Error taxonomy for the bot.
//!
//! Three families matter to the dispatcher: command errors (bad user input,
//! always answered in-channel unless the user is unauthorized), storage
//! errors (where "not found" is a normal condition, not a failure), and
//! everything else (ledger and collaborator failures, wrapped as `Other`
//! and answered with a generic apology).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The user's input could not be turned into a command. The response is
    /// sent back to `chat_id`, except for unauthorized users who get a
    /// rebuff instead.
    #[error("{response}")]
    Command {
        response: String,
        chat_id: i64,
        unauthorized: bool,
    },

    /// No previous command is stored for the user (or it has expired).
    #[error("no previous command")]
    NotFound,

    /// The conversation state backend failed or timed out.
    #[error("{0}")]
    Storage(String),

    /// The category does not appear in the configured name column.
    #[error("category '{0}' not found")]
    CategoryNotFound(String),

    /// The user has no spreadsheet source configured.
    #[error("no spreadsheet source configured for user {0}")]
    NoSource(u64),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
