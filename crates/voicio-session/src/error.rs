//! Error types for the voice-session controller.

use voicio_core::error::VoicioError;

use crate::state::SessionState;

/// Errors from the voice-session controller and its host ports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("{0} is not supported on this host")]
    Unsupported(String),
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
    #[error("a reply is still pending for the previous turn")]
    TurnInFlight,
    #[error("capture error: {0}")]
    Capture(String),
    #[error("synthesis error: {0}")]
    Synthesis(String),
}

impl From<SessionError> for VoicioError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Unsupported(what) => VoicioError::Unsupported(what),
            SessionError::Capture(msg) => VoicioError::Capture(msg),
            SessionError::Synthesis(msg) => VoicioError::Synthesis(msg),
            other => VoicioError::Session(other.to_string()),
        }
    }
}
