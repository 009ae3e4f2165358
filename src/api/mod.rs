//! Collaborator contracts: the chat transport and the remote file store.
//!
//! The dispatcher only sees these traits; the Telegram and WebDAV
//! implementations live in their own modules, and the tests swap in the
//! in-memory doubles from `crate::test`.

pub mod telegram;
mod webdav;

pub use telegram::TelegramMessenger;
pub use webdav::WebdavDocuments;

use crate::config::SheetSource;
use crate::model::Entry;
use crate::Result;
use async_trait::async_trait;

/// Fetches and stores the ledger document as opaque bytes. Failures are
/// opaque I/O errors to the core; there is no conflict detection, the
/// last writer wins.
#[async_trait]
pub trait Documents: Send + Sync {
    async fn fetch(&self, source: &SheetSource) -> Result<Vec<u8>>;
    async fn store(&self, source: &SheetSource, bytes: &[u8]) -> Result<()>;
}

/// Sends user-facing output. One implementation per chat transport.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Sends the category/value listing as one message.
    async fn send_entries(&self, chat_id: i64, entries: &[Entry]) -> Result<()>;

    /// Sends an inline keyboard of category buttons whose callback
    /// payloads are `{action}:{category}`.
    async fn send_category_picker(
        &self,
        chat_id: i64,
        entries: &[Entry],
        action: &str,
    ) -> Result<()>;

    /// Strips the inline keyboard from a previously sent message.
    async fn clear_markup(&self, chat_id: i64, message_id: i32) -> Result<()>;
}
