//! Voicio Storage crate - SQLite persistence for saved conversations.
//!
//! Provides a WAL-mode SQLite database with migrations, the conversation
//! store (records plus per-chat message log) and a key-value table standing
//! in for client-local storage.

pub mod db;
pub mod kv;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use kv::SqliteKeyValueStore;
pub use repository::ConversationRepository;
