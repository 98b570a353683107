//! Timer tokens.
//!
//! The controller never sleeps. It asks its driver to arm a timer and later
//! receives `TimerFired(token)`. Each kind has at most one armed token;
//! re-arming or cancelling simply forgets the previous generation, so a stale
//! firing is recognised and dropped.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Silence gap after the last final result.
    Debounce,
    /// Pause between end of playback and re-opening capture.
    Settle,
    /// Back-off after a transient capture error.
    Retry,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerKind::Debounce => write!(f, "debounce"),
            TimerKind::Settle => write!(f, "settle"),
            TimerKind::Retry => write!(f, "retry"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    pub kind: TimerKind,
    pub generation: u64,
}

/// Currently armed generation per timer kind.
#[derive(Debug, Default, Clone)]
pub struct TimerSlots {
    next_generation: u64,
    debounce: Option<u64>,
    settle: Option<u64>,
    retry: Option<u64>,
}

impl TimerSlots {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: TimerKind) -> &mut Option<u64> {
        match kind {
            TimerKind::Debounce => &mut self.debounce,
            TimerKind::Settle => &mut self.settle,
            TimerKind::Retry => &mut self.retry,
        }
    }

    /// Arm (or re-arm) `kind`, invalidating any earlier token of that kind.
    pub fn arm(&mut self, kind: TimerKind) -> TimerToken {
        self.next_generation += 1;
        let generation = self.next_generation;
        *self.slot(kind) = Some(generation);
        TimerToken { kind, generation }
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        *self.slot(kind) = None;
    }

    pub fn cancel_all(&mut self) {
        self.debounce = None;
        self.settle = None;
        self.retry = None;
    }

    /// Consume a fired token. Returns `true` only when it is the armed one.
    pub fn fire(&mut self, token: TimerToken) -> bool {
        let slot = self.slot(token.kind);
        if *slot == Some(token.generation) {
            *slot = None;
            true
        } else {
            false
        }
    }
}
