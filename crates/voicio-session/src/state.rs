//! Voice-session state machine.
//!
//! Enforces valid state transitions for one capture/reply cycle:
//! - Idle -> Listening (start capture)
//! - Listening -> PendingSend (final result, debounce armed)
//! - PendingSend -> Sending (debounce fired)
//! - PendingSend -> Listening (debounce fired on a blank transcript)
//! - Idle/Listening/PendingSend -> Sending (manual text submit)
//! - Sending -> Speaking (reply received)
//! - Speaking -> Listening (playback ended, capture re-armed)
//! - any active state -> Idle (stop, fatal capture error, playback ended)

use std::fmt;

use crate::error::SessionError;

/// Operational state of the voice-session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Not listening. Manual text entry still works.
    Idle,
    /// Capture open, waiting for a final result.
    Listening,
    /// At least one final result buffered, debounce timer armed.
    PendingSend,
    /// Utterance handed to the language-model proxy, awaiting a reply.
    Sending,
    /// Reply being spoken. Capture paused.
    Speaking,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Listening => write!(f, "Listening"),
            SessionState::PendingSend => write!(f, "PendingSend"),
            SessionState::Sending => write!(f, "Sending"),
            SessionState::Speaking => write!(f, "Speaking"),
        }
    }
}

impl SessionState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            (Idle, Listening)
                | (Idle, Sending)
                | (Listening, PendingSend)
                | (Listening, Sending)
                | (PendingSend, Sending)
                | (PendingSend, Listening)
                | (Sending, Speaking)
                | (Speaking, Listening)
                // Stop and error transitions
                | (Listening, Idle)
                | (PendingSend, Idle)
                | (Sending, Idle)
                | (Speaking, Idle)
        )
    }

    /// Whether capture is supposed to be open in this state.
    pub fn is_capturing(&self) -> bool {
        matches!(self, SessionState::Listening | SessionState::PendingSend)
    }

    /// Whether a turn is between submit and the end of playback.
    pub fn is_turn_in_flight(&self) -> bool {
        matches!(self, SessionState::Sending | SessionState::Speaking)
    }
}

/// State machine for the session lifecycle.
///
/// Owned exclusively by one controller, so no interior locking. All
/// transitions are validated before being applied.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: SessionState,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    /// Returns the current state.
    pub fn current(&self) -> SessionState {
        self.state
    }

    /// Attempt to transition to the target state.
    pub fn transition(&mut self, target: SessionState) -> Result<(), SessionError> {
        if self.state.can_transition_to(&target) {
            tracing::debug!("Session state: {} -> {}", self.state, target);
            self.state = target;
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: self.state,
                to: target,
            })
        }
    }
}
