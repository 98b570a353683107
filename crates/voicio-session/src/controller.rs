//! The voice-session controller.
//!
//! `VoiceController` is a synchronous reducer: every input goes through
//! [`VoiceController::dispatch`] (or [`VoiceController::submit_text`]) and
//! comes back as a list of [`Effect`]s for the async driver to carry out.
//! Capture and synthesis backends are called directly since opening,
//! closing and queueing are non-blocking on every host we target.

use std::time::Duration;

use voicio_core::config::SessionConfig;
use voicio_core::types::Notice;

use crate::accumulator::TranscriptAccumulator;
use crate::capture::{CaptureBackend, CaptureError, CaptureErrorKind, CaptureHandle};
use crate::error::SessionError;
use crate::event::{Effect, SessionEvent};
use crate::state::{SessionState, StateMachine};
use crate::synth::{SpeechId, SpeechSynthesizer};
use crate::timer::{TimerKind, TimerSlots, TimerToken};

pub const CAPTURE_UNSUPPORTED_NOTICE: &str =
    "Speech recognition is not supported in this environment. You can still type messages.";
pub const SYNTHESIS_UNSUPPORTED_NOTICE: &str =
    "Speech synthesis is not supported in this environment. Replies will be shown as text only.";

/// Timing knobs for one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Silence after the last final result before the utterance is sent.
    pub debounce: Duration,
    /// Pause after playback ends before capture reopens.
    pub settle: Duration,
    /// Back-off before reopening capture after a transient failure.
    pub retry: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1000),
            settle: Duration::from_millis(300),
            retry: Duration::from_millis(1000),
        }
    }
}

impl From<&SessionConfig> for ControllerSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            debounce: config.debounce(),
            settle: config.settle(),
            retry: config.retry(),
        }
    }
}

pub struct VoiceController {
    settings: ControllerSettings,
    machine: StateMachine,
    accumulator: TranscriptAccumulator,
    timers: TimerSlots,
    capture: Box<dyn CaptureBackend>,
    synth: Box<dyn SpeechSynthesizer>,
    /// The user wants capture re-armed after every turn.
    continuous: bool,
    capture_available: bool,
    synth_available: bool,
    next_handle: u64,
    current: Option<CaptureHandle>,
    /// `CaptureStarted` seen for `current`.
    started: bool,
    next_speech: u64,
    speaking: Option<SpeechId>,
    /// A submitted turn has no `ReplyReady` yet. Survives `Stop`.
    awaiting_reply: bool,
}

impl VoiceController {
    pub fn new(
        settings: ControllerSettings,
        capture: Box<dyn CaptureBackend>,
        synth: Box<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            settings,
            machine: StateMachine::new(),
            accumulator: TranscriptAccumulator::new(),
            timers: TimerSlots::new(),
            capture,
            synth,
            continuous: false,
            capture_available: true,
            synth_available: true,
            next_handle: 0,
            current: None,
            started: false,
            next_speech: 0,
            speaking: None,
            awaiting_reply: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.machine.current()
    }

    pub fn interim(&self) -> &str {
        self.accumulator.interim()
    }

    /// Final results buffered for the next send.
    pub fn transcript(&self) -> &str {
        self.accumulator.as_str()
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    pub fn capture_available(&self) -> bool {
        self.capture_available
    }

    pub fn current_capture(&self) -> Option<CaptureHandle> {
        self.current
    }

    /// A request has been handed to the model and not yet answered.
    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    pub fn dispatch(&mut self, event: SessionEvent) -> Vec<Effect> {
        let mut fx = Vec::new();
        match event {
            SessionEvent::Start => self.on_start(&mut fx),
            SessionEvent::Stop => self.on_stop(&mut fx),
            SessionEvent::CaptureStarted(handle) => {
                if self.current == Some(handle) {
                    self.started = true;
                } else {
                    tracing::trace!("Ignoring start of stale {}", handle);
                }
            }
            SessionEvent::CaptureResult {
                handle,
                text,
                is_final,
            } => self.on_result(handle, &text, is_final, &mut fx),
            SessionEvent::CaptureEnded(handle) => self.on_capture_ended(handle, &mut fx),
            SessionEvent::CaptureError { handle, error } => {
                self.on_capture_error(handle, error, &mut fx)
            }
            SessionEvent::TimerFired(token) => self.on_timer(token, &mut fx),
            SessionEvent::ReplyReady(text) => self.on_reply(&text, &mut fx),
            SessionEvent::SynthesisEnded(id) => {
                if self.speaking == Some(id) {
                    self.speaking = None;
                    self.playback_finished(&mut fx);
                } else {
                    tracing::trace!("Ignoring end of stale {}", id);
                }
            }
        }
        fx
    }

    /// Send typed text as a turn, bypassing the debounce.
    ///
    /// Blank text is a no-op. Rejected with `TurnInFlight` while a previous
    /// turn is still being answered or spoken, including a turn whose reply
    /// is still outstanding after `Stop`. Continuous mode is unchanged.
    pub fn submit_text(&mut self, text: &str) -> Result<Vec<Effect>, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        if self.awaiting_reply || self.state().is_turn_in_flight() {
            return Err(SessionError::TurnInFlight);
        }

        let mut fx = Vec::new();
        self.timers.cancel(TimerKind::Debounce);
        self.timers.cancel(TimerKind::Retry);
        self.close_capture();
        self.accumulator.clear();
        fx.push(Effect::Interim(String::new()));
        self.submit(text, &mut fx);
        Ok(fx)
    }

    fn on_start(&mut self, fx: &mut Vec<Effect>) {
        if !self.capture_available {
            tracing::debug!("Start ignored: speech recognition unavailable");
            return;
        }
        self.continuous = true;
        match self.state() {
            SessionState::Idle => {
                if self.open_capture(fx) {
                    self.enter(SessionState::Listening, fx);
                }
            }
            SessionState::Listening | SessionState::PendingSend => {
                tracing::debug!("Restarting capture from {}", self.state());
                self.timers.cancel(TimerKind::Debounce);
                self.timers.cancel(TimerKind::Retry);
                self.accumulator.clear();
                fx.push(Effect::Interim(String::new()));
                if self.open_capture(fx) {
                    self.enter(SessionState::Listening, fx);
                }
            }
            // Capture re-arms once playback is over.
            SessionState::Sending | SessionState::Speaking => {}
        }
    }

    fn on_stop(&mut self, fx: &mut Vec<Effect>) {
        self.continuous = false;
        self.timers.cancel_all();
        self.accumulator.clear();
        self.close_capture();
        if self.speaking.take().is_some() {
            self.synth.cancel();
        }
        fx.push(Effect::Interim(String::new()));
        self.enter(SessionState::Idle, fx);
    }

    fn on_result(&mut self, handle: CaptureHandle, text: &str, is_final: bool, fx: &mut Vec<Effect>) {
        if self.current != Some(handle) || !self.state().is_capturing() {
            tracing::trace!("Ignoring result from stale {}", handle);
            return;
        }
        if !is_final {
            self.accumulator.set_interim(text);
            fx.push(Effect::Interim(text.to_string()));
            return;
        }

        self.accumulator.push_final(text);
        fx.push(Effect::Interim(String::new()));
        // Empty results do not extend the silence gap.
        if text.trim().is_empty() {
            return;
        }
        if self.state() == SessionState::Listening {
            self.enter(SessionState::PendingSend, fx);
        }
        self.arm(TimerKind::Debounce, self.settings.debounce, fx);
    }

    fn on_capture_ended(&mut self, handle: CaptureHandle, fx: &mut Vec<Effect>) {
        if self.current != Some(handle) {
            return;
        }
        let started = self.started;
        self.current = None;
        self.started = false;

        if !self.state().is_capturing() {
            return;
        }
        if !self.continuous {
            self.enter(SessionState::Idle, fx);
        } else if started {
            self.open_capture(fx);
        } else {
            // Ended without ever starting: back off instead of spinning.
            tracing::debug!("{} ended before starting, retrying later", handle);
            self.arm(TimerKind::Retry, self.settings.retry, fx);
        }
    }

    fn on_capture_error(&mut self, handle: CaptureHandle, error: CaptureError, fx: &mut Vec<Effect>) {
        if self.current != Some(handle) {
            return;
        }
        self.close_capture();

        match error.kind {
            CaptureErrorKind::Fatal => {
                tracing::warn!("Capture failed permanently: {}", error);
                self.continuous = false;
                self.timers.cancel_all();
                self.accumulator.clear();
                fx.push(Effect::Notice(Notice::error(format!(
                    "Microphone unavailable ({}). Voice input has been turned off.",
                    error
                ))));
                fx.push(Effect::Interim(String::new()));
                self.enter(SessionState::Idle, fx);
            }
            CaptureErrorKind::Transient => {
                tracing::debug!("Transient capture error on {}: {}", handle, error);
                if self.continuous && self.state().is_capturing() {
                    self.arm(TimerKind::Retry, self.settings.retry, fx);
                } else if self.state().is_capturing() {
                    self.enter(SessionState::Idle, fx);
                }
            }
        }
    }

    fn on_timer(&mut self, token: TimerToken, fx: &mut Vec<Effect>) {
        if !self.timers.fire(token) {
            tracing::trace!("Ignoring stale {} timer", token.kind);
            return;
        }
        match token.kind {
            TimerKind::Debounce => self.on_debounce(fx),
            TimerKind::Settle => {
                if self.state() == SessionState::Speaking && self.open_capture(fx) {
                    self.enter(SessionState::Listening, fx);
                }
            }
            TimerKind::Retry => {
                if self.continuous && self.state().is_capturing() && self.current.is_none() {
                    self.open_capture(fx);
                }
            }
        }
    }

    fn on_debounce(&mut self, fx: &mut Vec<Effect>) {
        if self.state() != SessionState::PendingSend {
            return;
        }
        if self.awaiting_reply {
            // The previous turn was stopped but not yet answered; hold the
            // utterance until it is.
            tracing::debug!("Reply to the previous turn outstanding, holding utterance");
            self.arm(TimerKind::Debounce, self.settings.debounce, fx);
            return;
        }
        self.timers.cancel(TimerKind::Retry);
        self.close_capture();
        fx.push(Effect::Interim(String::new()));

        if self.accumulator.is_blank() {
            self.accumulator.clear();
            if self.open_capture(fx) {
                self.enter(SessionState::Listening, fx);
            }
            return;
        }
        let utterance = self.accumulator.take();
        self.submit(utterance.trim(), fx);
    }

    fn submit(&mut self, utterance: &str, fx: &mut Vec<Effect>) {
        self.awaiting_reply = true;
        self.enter(SessionState::Sending, fx);
        fx.push(Effect::Submit(utterance.to_string()));
    }

    fn on_reply(&mut self, text: &str, fx: &mut Vec<Effect>) {
        self.awaiting_reply = false;
        if self.state() != SessionState::Sending {
            tracing::debug!("Reply arrived in {}, not speaking it", self.state());
            return;
        }
        self.enter(SessionState::Speaking, fx);

        if !self.synth_available {
            self.playback_finished(fx);
            return;
        }
        self.next_speech += 1;
        let id = SpeechId(self.next_speech);
        match self.synth.speak(id, text) {
            Ok(()) => self.speaking = Some(id),
            Err(SessionError::Unsupported(_)) => {
                self.synth_available = false;
                fx.push(Effect::Notice(Notice::warning(SYNTHESIS_UNSUPPORTED_NOTICE)));
                self.playback_finished(fx);
            }
            Err(e) => {
                tracing::warn!("Speech synthesis failed: {}", e);
                self.playback_finished(fx);
            }
        }
    }

    fn playback_finished(&mut self, fx: &mut Vec<Effect>) {
        if self.continuous && self.capture_available {
            self.arm(TimerKind::Settle, self.settings.settle, fx);
        } else {
            self.enter(SessionState::Idle, fx);
        }
    }

    /// Open a fresh capture handle, closing the current one first.
    ///
    /// Returns `false` only when the host has no speech recognition, in
    /// which case the controller has already moved to `Idle`.
    fn open_capture(&mut self, fx: &mut Vec<Effect>) -> bool {
        self.close_capture();
        self.next_handle += 1;
        let handle = CaptureHandle(self.next_handle);

        match self.capture.open(handle) {
            Ok(()) => {
                tracing::debug!("Opened {}", handle);
                self.current = Some(handle);
                self.started = false;
                true
            }
            Err(SessionError::Unsupported(what)) => {
                tracing::warn!("{} unavailable, voice input disabled", what);
                self.capture_available = false;
                self.continuous = false;
                self.timers.cancel_all();
                fx.push(Effect::Notice(Notice::error(CAPTURE_UNSUPPORTED_NOTICE)));
                self.enter(SessionState::Idle, fx);
                false
            }
            Err(e) => {
                tracing::debug!("Could not open {}: {}", handle, e);
                self.arm(TimerKind::Retry, self.settings.retry, fx);
                true
            }
        }
    }

    fn close_capture(&mut self) {
        if let Some(handle) = self.current.take() {
            self.capture.close(handle);
            tracing::debug!("Closed {}", handle);
        }
        self.started = false;
    }

    fn arm(&mut self, kind: TimerKind, delay: Duration, fx: &mut Vec<Effect>) {
        let token = self.timers.arm(kind);
        fx.push(Effect::ArmTimer { token, delay });
    }

    fn enter(&mut self, target: SessionState, fx: &mut Vec<Effect>) {
        if self.state() == target {
            return;
        }
        if let Err(e) = self.machine.transition(target) {
            tracing::warn!("{}", e);
            return;
        }
        fx.push(Effect::StateChanged(target));
    }
}
