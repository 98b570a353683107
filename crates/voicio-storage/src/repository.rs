//! SQLite-backed conversation store.
//!
//! Saved conversations keep their message list as a JSON snapshot in the
//! `conversations` row; the per-chat message log lives in `chat_messages`
//! and grows one row per `append_message`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use voicio_core::error::VoicioError;
use voicio_core::ports::ConversationStore;
use voicio_core::types::{ConversationFilter, ConversationRecord, Message, Role};

use crate::db::Database;

/// Repository for saved conversations.
pub struct ConversationRepository {
    db: Arc<Database>,
}

impl ConversationRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Number of saved conversations across all users.
    pub fn count(&self) -> Result<u64, VoicioError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))
                .map_err(|e| VoicioError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }

}

#[async_trait]
impl ConversationStore for ConversationRepository {
    async fn create(&self, record: &ConversationRecord) -> Result<Uuid, VoicioError> {
        let messages = serde_json::to_string(&record.messages)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversations (id, user_id, created_at, messages)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    record.id.to_string(),
                    record.user_id,
                    record.created_at.timestamp_millis(),
                    messages,
                ],
            )
            .map_err(|e| VoicioError::Storage(format!("Failed to save conversation: {}", e)))?;
            Ok(())
        })?;

        tracing::debug!(
            "Saved conversation {} ({} messages) for {}",
            record.id,
            record.messages.len(),
            record.user_id
        );
        Ok(record.id)
    }

    async fn list(&self, filter: &ConversationFilter) -> Result<Vec<ConversationRecord>, VoicioError> {
        self.db.with_conn(|conn| {
            // rowid breaks ties between saves in the same millisecond.
            let (sql, user) = match filter {
                ConversationFilter::All => (
                    "SELECT id, user_id, created_at, messages FROM conversations
                     ORDER BY created_at DESC, rowid DESC",
                    None,
                ),
                ConversationFilter::User(user) => (
                    "SELECT id, user_id, created_at, messages FROM conversations
                     WHERE user_id = ?1
                     ORDER BY created_at DESC, rowid DESC",
                    Some(user.as_str()),
                ),
            };

            let mut stmt = conn
                .prepare(sql)
                .map_err(|e| VoicioError::Storage(e.to_string()))?;
            let rows = match user {
                Some(user) => stmt.query_map(rusqlite::params![user], row_to_raw),
                None => stmt.query_map([], row_to_raw),
            }
            .map_err(|e| VoicioError::Storage(e.to_string()))?;

            let mut records = Vec::new();
            for row in rows {
                let raw = row.map_err(|e| VoicioError::Storage(e.to_string()))?;
                records.push(raw.into_record()?);
            }
            Ok(records)
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<ConversationRecord>, VoicioError> {
        self.db.with_conn(|conn| {
            let raw = conn
                .query_row(
                    "SELECT id, user_id, created_at, messages FROM conversations WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                    row_to_raw,
                )
                .optional()
                .map_err(|e| VoicioError::Storage(e.to_string()))?;

            raw.map(RawConversation::into_record).transpose()
        })
    }

    async fn append_message(&self, chat_id: Uuid, message: &Message) -> Result<(), VoicioError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_messages (chat_id, role, content, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    chat_id.to_string(),
                    role_to_str(message.role),
                    message.content,
                    message.timestamp,
                ],
            )
            .map_err(|e| VoicioError::Storage(format!("Failed to append message: {}", e)))?;
            Ok(())
        })
    }

    async fn messages(&self, chat_id: Uuid) -> Result<Vec<Message>, VoicioError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT role, content, timestamp FROM chat_messages
                     WHERE chat_id = ?1
                     ORDER BY id ASC",
                )
                .map_err(|e| VoicioError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![chat_id.to_string()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(|e| VoicioError::Storage(e.to_string()))?;

            let mut messages = Vec::new();
            for row in rows {
                let (role, content, timestamp) =
                    row.map_err(|e| VoicioError::Storage(e.to_string()))?;
                messages.push(Message {
                    role: role_from_str(&role)?,
                    content,
                    timestamp,
                });
            }
            Ok(messages)
        })
    }
}

// ============================================================================
// Row conversion.
// ============================================================================

struct RawConversation {
    id: String,
    user_id: String,
    created_at: i64,
    messages: String,
}

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawConversation> {
    Ok(RawConversation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        created_at: row.get(2)?,
        messages: row.get(3)?,
    })
}

impl RawConversation {
    fn into_record(self) -> Result<ConversationRecord, VoicioError> {
        Ok(ConversationRecord {
            id: Uuid::parse_str(&self.id)
                .map_err(|e| VoicioError::Storage(format!("Invalid UUID: {}", e)))?,
            user_id: self.user_id,
            messages: serde_json::from_str(&self.messages)?,
            created_at: Utc
                .timestamp_millis_opt(self.created_at)
                .single()
                .unwrap_or_default(),
        })
    }
}

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Agent => "agent",
    }
}

fn role_from_str(role: &str) -> Result<Role, VoicioError> {
    match role {
        "user" => Ok(Role::User),
        "agent" => Ok(Role::Agent),
        other => Err(VoicioError::Storage(format!("Unknown message role: {}", other))),
    }
}
