//! Session driver: the single task that owns the controller and the view.
//!
//! User commands, host events and proxy replies are multiplexed with
//! `tokio::select!`. Controller effects are carried out here: timers become
//! spawned sleeps that post `TimerFired` back, submits become spawned proxy
//! calls that post their outcome back. The only awaits inside the loop are
//! conversation-store calls.

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use voicio_core::ports::{Clipboard, ConversationStore, KeyValueStore};
use voicio_core::types::{ConversationRecord, Message, Notice, Tone};
use voicio_core::VoicioConfig;
use voicio_session::{
    CaptureBackend, ControllerSettings, Effect, SessionError, SessionEvent, SessionState,
    SpeechSynthesizer, VoiceController,
};

use crate::error::ChatError;
use crate::llm::LanguageModel;
use crate::view::ChatView;

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Channel on which capture and synthesis backends report back.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Requests from the user interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    StartListening,
    StopListening,
    SendText(String),
    SetTone(String),
    Save,
    NewSession,
    /// Copy the agent message at this index.
    Copy(usize),
    History,
    Open(Uuid),
    Shutdown,
}

/// Everything the user interface needs to render.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatUpdate {
    State(SessionState),
    Interim(String),
    Message(Message),
    Notice(Notice),
    Tone(Tone),
    /// The whole list was replaced (restore, open).
    Messages(Vec<Message>),
    Cleared,
    Saved(Uuid),
    History(Vec<ConversationRecord>),
}

/// Host capabilities the session runs against.
pub struct SessionPorts {
    pub capture: Box<dyn CaptureBackend>,
    pub synth: Box<dyn SpeechSynthesizer>,
    pub model: Arc<dyn LanguageModel>,
    pub store: Arc<dyn ConversationStore>,
    pub storage: Arc<dyn KeyValueStore>,
    pub clipboard: Arc<dyn Clipboard>,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub controller: ControllerSettings,
    /// Start capture as soon as the session runs.
    pub auto_start: bool,
    pub user_id: String,
    pub history_turns: usize,
}

impl SessionOptions {
    pub fn from_config(config: &VoicioConfig) -> Self {
        Self {
            controller: ControllerSettings::from(&config.session),
            auto_start: config.session.auto_start,
            user_id: config.general.user_id.clone(),
            history_turns: config.proxy.history_turns,
        }
    }
}

pub struct ChatSession {
    controller: VoiceController,
    view: ChatView,
    auto_start: bool,
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn ConversationStore>,
    clipboard: Arc<dyn Clipboard>,
    events_tx: EventSender,
    events_rx: EventReceiver,
    replies_tx: mpsc::UnboundedSender<Result<String, ChatError>>,
    replies_rx: mpsc::UnboundedReceiver<Result<String, ChatError>>,
    updates: mpsc::UnboundedSender<ChatUpdate>,
}

impl ChatSession {
    /// Build a session. `events` must be the channel the capture and
    /// synthesis backends in `ports` post to.
    pub fn new(
        options: SessionOptions,
        ports: SessionPorts,
        events: (EventSender, EventReceiver),
    ) -> (Self, mpsc::UnboundedReceiver<ChatUpdate>) {
        let (events_tx, events_rx) = events;
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        let (updates, updates_rx) = mpsc::unbounded_channel();

        let session = Self {
            controller: VoiceController::new(options.controller, ports.capture, ports.synth),
            view: ChatView::new(ports.storage, options.user_id, options.history_turns),
            auto_start: options.auto_start,
            model: ports.model,
            store: ports.store,
            clipboard: ports.clipboard,
            events_tx,
            events_rx,
            replies_tx,
            replies_rx,
            updates,
        };
        (session, updates_rx)
    }

    /// Run until `Shutdown` or until the command channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<ChatCommand>) {
        self.view.restore();
        self.publish(ChatUpdate::Tone(self.view.tone()));
        self.publish(ChatUpdate::Messages(self.view.messages().to_vec()));
        self.publish(ChatUpdate::State(self.controller.state()));
        if self.auto_start {
            let fx = self.controller.dispatch(SessionEvent::Start);
            self.apply(fx);
        }

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    None | Some(ChatCommand::Shutdown) => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(event) = self.events_rx.recv() => {
                    let fx = self.controller.dispatch(event);
                    self.apply(fx);
                }
                Some(outcome) = self.replies_rx.recv() => self.handle_reply(outcome),
            }
        }

        let fx = self.controller.dispatch(SessionEvent::Stop);
        self.apply(fx);
        tracing::info!("Chat session stopped");
    }

    async fn handle_command(&mut self, command: ChatCommand) {
        tracing::debug!(?command, "Handling command");
        match command {
            ChatCommand::StartListening => {
                let fx = self.controller.dispatch(SessionEvent::Start);
                self.apply(fx);
            }
            ChatCommand::StopListening => {
                let fx = self.controller.dispatch(SessionEvent::Stop);
                self.apply(fx);
            }
            ChatCommand::SendText(text) => match self.controller.submit_text(&text) {
                Ok(fx) => self.apply(fx),
                Err(SessionError::TurnInFlight) => {
                    self.publish(ChatUpdate::Notice(Notice::warning(
                        "Please wait for the current reply to finish.",
                    )));
                }
                Err(e) => tracing::warn!("Could not submit text: {}", e),
            },
            ChatCommand::SetTone(label) => {
                let tone = self.view.set_tone(&label);
                self.publish(ChatUpdate::Tone(tone));
            }
            ChatCommand::Save => {
                let store = self.store.clone();
                match self.view.save_conversation(store.as_ref()).await {
                    Ok(id) => {
                        self.publish(ChatUpdate::Saved(id));
                        self.publish(ChatUpdate::Cleared);
                        self.publish(ChatUpdate::Notice(Notice::info("Conversation saved.")));
                    }
                    Err(ChatError::EmptyConversation) => {
                        self.publish(ChatUpdate::Notice(Notice::info("Nothing to save yet.")));
                    }
                    Err(e) => {
                        tracing::warn!("Save failed: {}", e);
                        self.publish(ChatUpdate::Notice(Notice::warning(format!(
                            "Could not save the conversation: {}",
                            e
                        ))));
                    }
                }
            }
            ChatCommand::NewSession => {
                self.view.new_session();
                self.publish(ChatUpdate::Cleared);
            }
            ChatCommand::Copy(index) => {
                let notice = match self.view.copy_message(index, self.clipboard.as_ref()) {
                    Ok(notice) => notice,
                    Err(e) => Notice::warning(e.to_string()),
                };
                self.publish(ChatUpdate::Notice(notice));
            }
            ChatCommand::History => {
                let store = self.store.clone();
                match self.view.history(store.as_ref()).await {
                    Ok(records) => self.publish(ChatUpdate::History(records)),
                    Err(e) => self.publish(ChatUpdate::Notice(Notice::warning(format!(
                        "Could not load saved conversations: {}",
                        e
                    )))),
                }
            }
            ChatCommand::Open(id) => {
                let store = self.store.clone();
                match self.view.open(store.as_ref(), id).await {
                    Ok(()) => self.publish(ChatUpdate::Messages(self.view.messages().to_vec())),
                    Err(e) => self.publish(ChatUpdate::Notice(Notice::warning(format!(
                        "Could not open conversation: {}",
                        e
                    )))),
                }
            }
            ChatCommand::Shutdown => {}
        }
    }

    fn handle_reply(&mut self, outcome: Result<String, ChatError>) {
        if outcome.is_ok() {
            tracing::info!("Reply received");
        }
        // Appended even when the user has moved on; the controller decides
        // whether it is still worth speaking.
        let message = self.view.complete_turn(outcome);
        self.publish(ChatUpdate::Message(message.clone()));
        let fx = self.controller.dispatch(SessionEvent::ReplyReady(message.content));
        self.apply(fx);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ArmTimer { token, delay } => {
                    let events = self.events_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = events.send(SessionEvent::TimerFired(token));
                    });
                }
                Effect::Submit(utterance) => {
                    tracing::info!(chars = utterance.len(), "Submitting turn");
                    let (message, payload) = self.view.begin_turn(&utterance);
                    self.publish(ChatUpdate::Message(message));

                    let model = self.model.clone();
                    let replies = self.replies_tx.clone();
                    tokio::spawn(async move {
                        let outcome = model.generate(&payload).await;
                        let _ = replies.send(outcome);
                    });
                }
                Effect::StateChanged(state) => {
                    tracing::debug!(state = %state, "Session state changed");
                    self.publish(ChatUpdate::State(state));
                }
                Effect::Interim(text) => self.publish(ChatUpdate::Interim(text)),
                Effect::Notice(notice) => self.publish(ChatUpdate::Notice(notice)),
            }
        }
    }

    fn publish(&self, update: ChatUpdate) {
        if self.updates.send(update).is_err() {
            tracing::trace!("No listener for chat updates");
        }
    }
}
