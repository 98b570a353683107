//! Host capability ports shared across crates.
//!
//! Client-local storage and the clipboard are synchronous, like their
//! browser counterparts. The conversation store is remote and therefore
//! async.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Result, VoicioError};
use crate::types::{ConversationFilter, ConversationRecord, Message};

/// Key under which the tone label is kept in client-local storage.
pub const TONE_KEY: &str = "tone";
/// Key under which the in-progress message list is kept (JSON array).
pub const MESSAGES_KEY: &str = "messages";

/// Read/write string key-value capability (browser local storage equivalent).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Remote persistence for saved conversations.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist a new record and return its identifier.
    async fn create(&self, record: &ConversationRecord) -> Result<Uuid>;

    /// List records matching `filter`, newest first.
    async fn list(&self, filter: &ConversationFilter) -> Result<Vec<ConversationRecord>>;

    /// Fetch a single record.
    async fn get(&self, id: Uuid) -> Result<Option<ConversationRecord>>;

    /// Append one message to the per-chat message log.
    async fn append_message(&self, chat_id: Uuid, message: &Message) -> Result<()>;

    /// Per-chat message log in insertion order.
    async fn messages(&self, chat_id: Uuid) -> Result<Vec<Message>>;
}

/// System clipboard write capability.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<()>;
}

/// Clipboard for hosts that have none. Every write fails with `Unsupported`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClipboard;

impl Clipboard for NoClipboard {
    fn write_text(&self, _text: &str) -> Result<()> {
        Err(VoicioError::Unsupported("clipboard".to_string()))
    }
}

/// Process-local key-value store. Used in tests and when no data directory
/// is available.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| VoicioError::Storage(format!("kv lock poisoned: {}", e)))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
