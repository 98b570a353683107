//! Speech-synthesis port.

use std::fmt;

use crate::error::SessionError;

/// Identifier of one spoken reply. Completion events carry it so that a
/// late completion for a cancelled reply cannot end a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeechId(pub u64);

impl fmt::Display for SpeechId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "speech#{}", self.0)
    }
}

/// Host text-to-speech capability.
///
/// `speak` returns as soon as playback has been queued; the backend reports
/// `SessionEvent::SynthesisEnded(id)` when playback finishes.
pub trait SpeechSynthesizer: Send {
    fn speak(&mut self, id: SpeechId, text: &str) -> Result<(), SessionError>;

    /// Stop any playback in progress. No completion event is required.
    fn cancel(&mut self);
}

/// Synthesizer for hosts without text-to-speech.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSynthesizer;

impl SpeechSynthesizer for NoSynthesizer {
    fn speak(&mut self, _id: SpeechId, _text: &str) -> Result<(), SessionError> {
        Err(SessionError::Unsupported("speech synthesis".to_string()))
    }

    fn cancel(&mut self) {}
}
