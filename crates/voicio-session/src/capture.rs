//! Speech-capture port.
//!
//! A backend opens one recognition session per [`CaptureHandle`] and reports
//! its callbacks back to the controller as [`SessionEvent`](crate::SessionEvent)s
//! tagged with that handle. The controller ignores events whose handle is not
//! the one it currently holds.

use std::fmt;

use crate::error::SessionError;

/// Identifier of one capture session. Monotonically increasing per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptureHandle(pub u64);

impl fmt::Display for CaptureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "capture#{}", self.0)
    }
}

/// How the controller should react to a recognition error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureErrorKind {
    /// Engine hiccup (no speech, network, aborted). Retried after a delay.
    Transient,
    /// Capture cannot work without user action (permission denied, no mic).
    Fatal,
}

/// Error reported by a capture backend for an open handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureError {
    pub kind: CaptureErrorKind,
    pub message: String,
}

impl CaptureError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: CaptureErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: CaptureErrorKind::Fatal,
            message: message.into(),
        }
    }

    /// Classify a recognition-engine error code (`not-allowed`, `no-speech`, ...).
    pub fn from_code(code: &str) -> Self {
        match code {
            "not-allowed" | "service-not-allowed" | "audio-capture" => Self::fatal(code),
            _ => Self::transient(code),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Host speech-recognition capability.
pub trait CaptureBackend: Send {
    /// Begin a recognition session for `handle`.
    ///
    /// Returns `SessionError::Unsupported` when the host has no speech
    /// recognition at all. Any other error is treated as transient.
    fn open(&mut self, handle: CaptureHandle) -> Result<(), SessionError>;

    /// Release `handle`. Must be idempotent.
    fn close(&mut self, handle: CaptureHandle);
}

/// Backend for hosts without speech recognition.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedCapture;

impl CaptureBackend for UnsupportedCapture {
    fn open(&mut self, _handle: CaptureHandle) -> Result<(), SessionError> {
        Err(SessionError::Unsupported("speech recognition".to_string()))
    }

    fn close(&mut self, _handle: CaptureHandle) {}
}
