//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use voicio_core::error::VoicioError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), VoicioError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| VoicioError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| VoicioError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: conversations");
    }

    Ok(())
}

/// Version 1: saved conversations, per-chat message log, key-value store.
fn apply_v1(conn: &Connection) -> Result<(), VoicioError> {
    conn.execute_batch(
        "
        -- One row per saved conversation. `messages` is the JSON snapshot
        -- taken when the user pressed save.
        CREATE TABLE IF NOT EXISTS conversations (
            id              TEXT PRIMARY KEY NOT NULL,
            user_id         TEXT NOT NULL,
            created_at      INTEGER NOT NULL,
            messages        TEXT NOT NULL DEFAULT '[]'
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_user
            ON conversations (user_id, created_at DESC);

        CREATE INDEX IF NOT EXISTS idx_conversations_created
            ON conversations (created_at DESC);

        CREATE TABLE IF NOT EXISTS chat_messages (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id         TEXT NOT NULL,
            role            TEXT NOT NULL
                            CHECK (role IN ('user', 'agent')),
            content         TEXT NOT NULL,
            timestamp       TEXT NOT NULL DEFAULT '',
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            FOREIGN KEY (chat_id) REFERENCES conversations(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_chat_messages_chat
            ON chat_messages (chat_id, id ASC);

        CREATE TABLE IF NOT EXISTS kv_store (
            key             TEXT PRIMARY KEY NOT NULL,
            value           TEXT NOT NULL,
            updated_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'conversations');
        ",
    )
    .map_err(|e| VoicioError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    #[test]
    fn test_migrations_run_once() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_conversations_table_exists() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO conversations (id, user_id, created_at, messages)
             VALUES ('c-1', 'local', 1700000000000, '[]')",
            [],
        )
        .unwrap();

        let user: String = conn
            .query_row("SELECT user_id FROM conversations WHERE id = 'c-1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(user, "local");
    }

    #[test]
    fn test_chat_messages_require_conversation() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO chat_messages (chat_id, role, content) VALUES ('missing', 'user', 'hi')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_chat_messages_role_check() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO conversations (id, user_id, created_at) VALUES ('c-1', 'local', 0)",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO chat_messages (chat_id, role, content) VALUES ('c-1', 'system', 'hi')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_chat_messages_cascade_delete() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO conversations (id, user_id, created_at) VALUES ('c-1', 'local', 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO chat_messages (chat_id, role, content) VALUES ('c-1', 'user', 'hi')",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM conversations WHERE id = 'c-1'", []).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chat_messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
