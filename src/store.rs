//! The conversation state store: the last resolved command per user.
//!
//! A bare amount message only means something in the context of the turn
//! before it, so the dispatcher stores every resolved command here and
//! reads it back when an amount arrives. Entries are short-lived; an
//! expired or missing entry is the distinguishable `Error::NotFound`, not
//! a failure. The trait seam allows an external backend (the original ran
//! against Valkey) without touching the dispatcher.

use crate::model::Command;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::warn;

/// How long a stored command stays readable.
pub const COMMAND_TTL: Duration = Duration::from_secs(15 * 60);

/// Bound on any single store operation; a slow backend must fail the turn
/// rather than hang it.
const STORE_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait CommandStore: Send + Sync {
    /// Stores `command` as the user's previous command, overwriting any
    /// prior entry and restarting the TTL.
    async fn put(&self, user_id: u64, command: &Command) -> Result<()>;

    /// Returns the user's previous command, `Error::NotFound` when absent
    /// or expired, `Error::Storage` for backend failures.
    async fn get(&self, user_id: u64) -> Result<Command>;
}

struct StoredEntry {
    json: String,
    stored_at: Instant,
}

/// In-process implementation keyed by user id. Commands are stored
/// serialized, as any external backend would hold them.
pub struct MemoryStore {
    ttl: Duration,
    entries: Mutex<HashMap<u64, StoredEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_ttl(COMMAND_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandStore for MemoryStore {
    async fn put(&self, user_id: u64, command: &Command) -> Result<()> {
        let json = serde_json::to_string(command).map_err(|e| {
            warn!(error = %e, "Failed to serialise command");
            Error::Storage("Failed to serialise command".to_string())
        })?;
        let mut entries = lock(&self.entries).await?;
        entries.insert(
            user_id,
            StoredEntry {
                json,
                stored_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, user_id: u64) -> Result<Command> {
        let mut entries = lock(&self.entries).await?;
        let entry = entries.get(&user_id).ok_or(Error::NotFound)?;
        if entry.stored_at.elapsed() >= self.ttl {
            entries.remove(&user_id);
            return Err(Error::NotFound);
        }
        serde_json::from_str(&entry.json).map_err(|e| {
            warn!(error = %e, "Failed to deserialise stored command");
            Error::Storage("Failed to deserialise stored command".to_string())
        })
    }
}

async fn lock<T>(mutex: &Mutex<T>) -> Result<tokio::sync::MutexGuard<'_, T>> {
    timeout(STORE_TIMEOUT, mutex.lock())
        .await
        .map_err(|_| Error::Storage("Conversation state store timed out".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, Command};

    fn command(action: Action) -> Command {
        Command {
            chat_id: 1,
            message_id: 2,
            user_id: 3,
            action,
        }
    }

    #[tokio::test]
    async fn test_put_then_get_returns_equal_command() {
        let store = MemoryStore::new();
        let stored = command(Action::UpdateCategoryChosen {
            category: "Groceries".to_string(),
        });
        store.put(3, &stored).await.unwrap();
        let loaded = store.get(3).await.unwrap();
        assert_eq!(loaded, stored);
    }

    #[tokio::test]
    async fn test_get_unknown_user_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.get(42).await, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn test_get_expired_entry_is_not_found() {
        let store = MemoryStore::with_ttl(Duration::ZERO);
        store.put(3, &command(Action::Ping)).await.unwrap();
        assert!(matches!(store.get(3).await, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn test_put_overwrites_previous_entry() {
        let store = MemoryStore::new();
        store.put(3, &command(Action::Ping)).await.unwrap();
        store.put(3, &command(Action::Help)).await.unwrap();
        let loaded = store.get(3).await.unwrap();
        assert_eq!(loaded.action, Action::Help);
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let store = MemoryStore::new();
        store.put(1, &command(Action::Ping)).await.unwrap();
        store.put(2, &command(Action::Help)).await.unwrap();
        assert_eq!(store.get(1).await.unwrap().action, Action::Ping);
        assert_eq!(store.get(2).await.unwrap().action, Action::Help);
    }
}
