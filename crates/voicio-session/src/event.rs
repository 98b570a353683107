//! Inputs to and outputs from the controller's dispatch function.

use std::time::Duration;

use voicio_core::types::Notice;

use crate::capture::{CaptureError, CaptureHandle};
use crate::state::SessionState;
use crate::synth::SpeechId;
use crate::timer::TimerToken;

/// Everything that can happen to a voice session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Explicit start, or start-up when auto-start is on.
    Start,
    /// Explicit stop.
    Stop,
    /// Capture backend callbacks.
    CaptureStarted(CaptureHandle),
    CaptureResult {
        handle: CaptureHandle,
        text: String,
        is_final: bool,
    },
    CaptureEnded(CaptureHandle),
    CaptureError {
        handle: CaptureHandle,
        error: CaptureError,
    },
    /// A timer armed through [`Effect::ArmTimer`] expired.
    TimerFired(TimerToken),
    /// Text to speak for the turn in flight (the reply or the apology).
    ReplyReady(String),
    /// Synthesis backend finished playing a reply.
    SynthesisEnded(SpeechId),
}

/// Work the controller asks its driver to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Post `SessionEvent::TimerFired(token)` after `delay`.
    ArmTimer { token: TimerToken, delay: Duration },
    /// Send this utterance to the language model.
    Submit(String),
    StateChanged(SessionState),
    /// Interim transcript for display. Empty clears it.
    Interim(String),
    Notice(Notice),
}
