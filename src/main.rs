use clap::Parser;
use coinrow::api::{self, TelegramMessenger, WebdavDocuments};
use coinrow::args::Args;
use coinrow::dispatch::Dispatcher;
use coinrow::store::MemoryStore;
use coinrow::{Config, Result};
use std::process::ExitCode;
use std::sync::Arc;
use teloxide::Bot;
use tracing::{debug, error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logger(args.log_level());
    debug!(
        "Log level set to {}",
        args.log_level().to_string().to_lowercase()
    );

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn main_inner(args: Args) -> Result<()> {
    let config = Arc::new(Config::load(args.config()).await?);
    info!(users = config.users.len(), "Configuration loaded");

    let bot = Bot::new(config.bot_token()?);
    let documents = Arc::new(WebdavDocuments::new()?);
    let store = Arc::new(MemoryStore::new());
    let messenger = Arc::new(TelegramMessenger::new(bot.clone()));
    let dispatcher = Arc::new(Dispatcher::new(config, documents, store, messenger));

    api::telegram::run(bot, dispatcher).await;
    Ok(())
}

/// Initializes the tracing subscriber.
fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
