//! Terminal front-end: typed speech capture, console playback and the
//! line-oriented command reader.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use voicio_chat::{ChatCommand, ChatUpdate, EventSender};
use voicio_core::types::{NoticeLevel, Role};
use voicio_session::{CaptureBackend, CaptureHandle, SessionError, SessionEvent, SpeechId, SpeechSynthesizer};

/// Capture backend fed by `/say` lines instead of a microphone.
///
/// Cloning shares the currently open handle, so the input loop can tag
/// typed speech with it.
#[derive(Clone)]
pub struct TerminalCapture {
    events: EventSender,
    current: Arc<Mutex<Option<CaptureHandle>>>,
}

impl TerminalCapture {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Deliver `text` as a final recognition result. Returns `false` when
    /// capture is not open.
    pub fn hear(&self, text: &str) -> bool {
        let handle = match self.current.lock() {
            Ok(current) => *current,
            Err(_) => None,
        };
        let Some(handle) = handle else {
            return false;
        };
        self.events
            .send(SessionEvent::CaptureResult {
                handle,
                text: text.to_string(),
                is_final: true,
            })
            .is_ok()
    }
}

impl CaptureBackend for TerminalCapture {
    fn open(&mut self, handle: CaptureHandle) -> Result<(), SessionError> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| SessionError::Capture("capture state poisoned".to_string()))?;
        *current = Some(handle);
        let _ = self.events.send(SessionEvent::CaptureStarted(handle));
        Ok(())
    }

    fn close(&mut self, handle: CaptureHandle) {
        if let Ok(mut current) = self.current.lock() {
            if *current == Some(handle) {
                *current = None;
            }
        }
    }
}

/// Pretends to speak by waiting roughly as long as reading the reply aloud.
pub struct ConsoleSynthesizer {
    events: EventSender,
    per_word: Duration,
}

impl ConsoleSynthesizer {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            per_word: Duration::from_millis(60),
        }
    }

    fn playback_time(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count().clamp(1, 100) as u32;
        self.per_word * words
    }
}

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn speak(&mut self, id: SpeechId, text: &str) -> Result<(), SessionError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SessionError::Synthesis(e.to_string()))?;
        let delay = self.playback_time(text);
        let events = self.events.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(SessionEvent::SynthesisEnded(id));
        });
        Ok(())
    }

    fn cancel(&mut self) {}
}

/// What one input line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(ChatCommand),
    /// Typed speech for the open capture handle.
    Say(String),
    Help,
    Quit,
    Invalid(String),
    Empty,
}

pub const HELP: &str = "\
Commands:
  <text>        send text as a message
  /say <text>   speak text into the microphone
  /listen       start continuous listening
  /stop         stop listening
  /tone <name>  Formal, Casual, Friendly or Default
  /save         save the conversation and start a new one
  /new          discard the conversation and start a new one
  /copy <n>     copy message n (no clipboard in the terminal, reports a warning)
  /history      list saved conversations
  /open <id>    open a saved conversation
  /quit         exit";

pub fn parse_line(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Input::Command(ChatCommand::SendText(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match (name, arg) {
        ("say", "") => Input::Invalid("usage: /say <text>".to_string()),
        ("say", text) => Input::Say(text.to_string()),
        ("listen", _) => Input::Command(ChatCommand::StartListening),
        ("stop", _) => Input::Command(ChatCommand::StopListening),
        ("tone", "") => Input::Invalid("usage: /tone <name>".to_string()),
        ("tone", tone) => Input::Command(ChatCommand::SetTone(tone.to_string())),
        ("save", _) => Input::Command(ChatCommand::Save),
        ("new", _) => Input::Command(ChatCommand::NewSession),
        ("copy", n) => match n.parse::<usize>() {
            Ok(n) if n >= 1 => Input::Command(ChatCommand::Copy(n - 1)),
            _ => Input::Invalid("usage: /copy <message number>".to_string()),
        },
        ("history", _) => Input::Command(ChatCommand::History),
        ("open", id) => match Uuid::parse_str(id) {
            Ok(id) => Input::Command(ChatCommand::Open(id)),
            Err(_) => Input::Invalid("usage: /open <conversation id>".to_string()),
        },
        ("help", _) => Input::Help,
        ("quit" | "exit", _) => Input::Quit,
        (other, _) => Input::Invalid(format!("unknown command /{}; try /help", other)),
    }
}

/// Render an update as terminal lines. `None` for updates with nothing to show.
pub fn render(update: &ChatUpdate, message_count: &mut usize) -> Option<String> {
    match update {
        ChatUpdate::State(state) => Some(format!("[{}]", state)),
        ChatUpdate::Interim(text) if text.is_empty() => None,
        ChatUpdate::Interim(text) => Some(format!("  … {}", text)),
        ChatUpdate::Message(message) => {
            *message_count += 1;
            let marker = match message.role {
                Role::User => ">",
                Role::Agent => "<",
            };
            Some(format!(
                "{} {} {} ({}, #{})",
                marker,
                message.role.display_name(),
                message.content,
                message.timestamp,
                message_count
            ))
        }
        ChatUpdate::Notice(notice) => {
            let level = match notice.level {
                NoticeLevel::Info => "info",
                NoticeLevel::Warning => "warning",
                NoticeLevel::Error => "error",
            };
            Some(format!("! {}: {}", level, notice.text))
        }
        ChatUpdate::Tone(tone) => Some(format!("tone: {}", tone)),
        ChatUpdate::Messages(messages) => {
            *message_count = messages.len();
            if messages.is_empty() {
                return None;
            }
            let lines: Vec<String> = messages
                .iter()
                .enumerate()
                .map(|(i, m)| format!("  #{} {}: {}", i + 1, m.role.display_name(), m.content))
                .collect();
            Some(lines.join("\n"))
        }
        ChatUpdate::Cleared => {
            *message_count = 0;
            Some("(new conversation)".to_string())
        }
        ChatUpdate::Saved(id) => Some(format!("saved as {}", id)),
        ChatUpdate::History(records) if records.is_empty() => {
            Some("no saved conversations".to_string())
        }
        ChatUpdate::History(records) => {
            let lines: Vec<String> = records
                .iter()
                .map(|r| {
                    format!(
                        "  {}  {}  {}",
                        r.id,
                        r.created_at.format("%Y-%m-%d %H:%M"),
                        r.title(40)
                    )
                })
                .collect();
            Some(lines.join("\n"))
        }
    }
}
