//! Voicio session crate - voice capture/reply cycle controller.
//!
//! Drives one conversation turn at a time through a strict state machine:
//! Idle -> Listening -> PendingSend -> Sending -> Speaking -> Listening.
//! The controller is synchronous and side-effect free apart from calls into
//! its capture and synthesis ports; timers and network calls are returned as
//! [`Effect`]s for an async driver.

pub mod accumulator;
pub mod capture;
pub mod controller;
pub mod error;
pub mod event;
pub mod state;
pub mod synth;
pub mod timer;

pub use accumulator::TranscriptAccumulator;
pub use capture::{CaptureBackend, CaptureError, CaptureErrorKind, CaptureHandle, UnsupportedCapture};
pub use controller::{ControllerSettings, VoiceController};
pub use error::SessionError;
pub use event::{Effect, SessionEvent};
pub use state::{SessionState, StateMachine};
pub use synth::{NoSynthesizer, SpeechId, SpeechSynthesizer};
pub use timer::{TimerKind, TimerSlots, TimerToken};
