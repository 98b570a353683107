pub mod config;
pub mod error;
pub mod ports;
pub mod types;

pub use config::VoicioConfig;
pub use error::{Result, VoicioError};
pub use ports::{Clipboard, ConversationStore, KeyValueStore, MemoryKeyValueStore, NoClipboard};
pub use types::*;
