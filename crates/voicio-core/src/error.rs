use thiserror::Error;

/// Top-level error type for the Voicio system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for VoicioError` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VoicioError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Proxy error: {0}")]
    Proxy(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Capability unavailable: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for VoicioError {
    fn from(err: toml::de::Error) -> Self {
        VoicioError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for VoicioError {
    fn from(err: toml::ser::Error) -> Self {
        VoicioError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for VoicioError {
    fn from(err: serde_json::Error) -> Self {
        VoicioError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Voicio operations.
pub type Result<T> = std::result::Result<T, VoicioError>;
