//! The CLI interface for the coinrow bot.

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

/// coinrow: a Telegram bot that records category-tagged amounts as
/// running additive formulas in a spreadsheet-style ledger held on a
/// WebDAV share.
///
/// The bot long-polls Telegram for updates and answers only the users
/// named in its configuration file. Each user gets their own ledger
/// document; amounts typed in chat are appended to the chosen category's
/// cell as `old+new`, so the cell doubles as an audit trail.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// Path to the JSON configuration file naming the allowed users and
    /// their ledger documents.
    #[arg(long, env = "COINROW_CONFIG", default_value = "coinrow.json")]
    config: PathBuf,
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn config(&self) -> &Path {
        &self.config
    }
}
