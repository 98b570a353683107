//! Error types for the chat layer.

use voicio_core::error::VoicioError;

/// Errors from the chat view, the proxy client and the session driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("conversation is empty")]
    EmptyConversation,
    #[error("conversation not found: {0}")]
    ConversationNotFound(uuid::Uuid),
    #[error("no agent message at position {0}")]
    NoSuchMessage(usize),
    #[error("proxy request failed: {0}")]
    Transport(String),
    #[error("proxy returned {status}: {message}")]
    ProxyStatus { status: u16, message: String },
    #[error("proxy reply had no response text")]
    EmptyReply,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("{0} is not supported on this host")]
    Unsupported(String),
}

impl From<VoicioError> for ChatError {
    fn from(err: VoicioError) -> Self {
        match err {
            VoicioError::Unsupported(what) => ChatError::Unsupported(what),
            other => ChatError::Storage(other.to_string()),
        }
    }
}

impl From<ChatError> for VoicioError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Transport(_) | ChatError::ProxyStatus { .. } | ChatError::EmptyReply => {
                VoicioError::Proxy(err.to_string())
            }
            ChatError::Storage(msg) => VoicioError::Storage(msg),
            ChatError::Unsupported(what) => VoicioError::Unsupported(what),
            other => VoicioError::Chat(other.to_string()),
        }
    }
}
