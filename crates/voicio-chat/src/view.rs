//! Chat view: the ordered message list plus the tone setting.
//!
//! Both are mirrored into client-local storage, the message list only on
//! explicit transitions (turn begun, turn completed, session cleared,
//! conversation opened) rather than on every mutation.

use std::sync::Arc;

use uuid::Uuid;

use voicio_core::ports::{Clipboard, ConversationStore, KeyValueStore, MESSAGES_KEY, TONE_KEY};
use voicio_core::types::{ConversationFilter, ConversationRecord, Message, Notice, Role, Tone};
use voicio_core::VoicioError;

use crate::error::ChatError;
use crate::history::{build_payload, ProxyMessage};

/// Agent message shown when the proxy could not produce a reply.
pub const APOLOGY: &str = "Sorry, I couldn't get a response right now. Please try again.";

pub struct ChatView {
    messages: Vec<Message>,
    tone: Tone,
    user_id: String,
    history_turns: usize,
    storage: Arc<dyn KeyValueStore>,
}

impl ChatView {
    pub fn new(storage: Arc<dyn KeyValueStore>, user_id: impl Into<String>, history_turns: usize) -> Self {
        Self {
            messages: Vec::new(),
            tone: Tone::Default,
            user_id: user_id.into(),
            history_turns,
            storage,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Load tone and in-progress messages left by a previous run.
    pub fn restore(&mut self) {
        match self.storage.get(TONE_KEY) {
            Ok(Some(label)) => self.tone = Tone::from_label(&label),
            Ok(None) => {}
            Err(e) => tracing::warn!("Could not read stored tone: {}", e),
        }

        match self.storage.get(MESSAGES_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<Message>>(&json) {
                Ok(messages) => {
                    tracing::info!("Restored {} messages", messages.len());
                    self.messages = messages;
                }
                Err(e) => {
                    tracing::warn!("Discarding corrupt stored messages: {}", e);
                    if let Err(e) = self.storage.remove(MESSAGES_KEY) {
                        tracing::warn!("Could not clear stored messages: {}", e);
                    }
                }
            },
            Ok(None) => {}
            Err(e) => tracing::warn!("Could not read stored messages: {}", e),
        }
    }

    /// Change the tone applied to subsequent prompts.
    pub fn set_tone(&mut self, label: &str) -> Tone {
        self.tone = Tone::from_label(label);
        if let Err(e) = self.storage.set(TONE_KEY, self.tone.label()) {
            tracing::warn!("Could not store tone: {}", e);
        }
        self.tone
    }

    /// Append the user's message and return the proxy payload for it.
    ///
    /// The payload is built from the messages before this one; the displayed
    /// message keeps the raw utterance.
    pub fn begin_turn(&mut self, utterance: &str) -> (Message, Vec<ProxyMessage>) {
        let payload = build_payload(&self.messages, utterance, self.tone.label(), self.history_turns);
        let message = Message::user(utterance);
        self.messages.push(message.clone());
        self.persist();
        (message, payload)
    }

    /// Append the agent's reply, or the apology when the turn failed.
    pub fn complete_turn(&mut self, outcome: Result<String, ChatError>) -> Message {
        let message = match outcome {
            Ok(text) => Message::agent(text),
            Err(e) => {
                tracing::warn!("Turn failed: {}", e);
                Message::agent(APOLOGY)
            }
        };
        self.messages.push(message.clone());
        self.persist();
        message
    }

    /// Clear the conversation locally without saving it.
    pub fn new_session(&mut self) {
        self.messages.clear();
        if let Err(e) = self.storage.remove(MESSAGES_KEY) {
            tracing::warn!("Could not clear stored messages: {}", e);
        }
    }

    /// Store the current conversation as a new record and start afresh.
    ///
    /// Empty conversations are rejected. On store failure, including a
    /// failure part way through the message log, nothing local is touched.
    pub async fn save_conversation(&mut self, store: &dyn ConversationStore) -> Result<Uuid, ChatError> {
        if self.messages.is_empty() {
            return Err(ChatError::EmptyConversation);
        }

        let record = ConversationRecord::new(self.user_id.clone(), self.messages.clone());
        let id = store.create(&record).await?;
        for message in &record.messages {
            if let Err(e) = store.append_message(id, message).await {
                tracing::warn!("Could not append to message log of {}: {}", id, e);
                return Err(e.into());
            }
        }

        tracing::info!("Saved conversation {} ({} messages)", id, record.messages.len());
        self.new_session();
        Ok(id)
    }

    /// Saved conversations for this user, newest first.
    pub async fn history(&self, store: &dyn ConversationStore) -> Result<Vec<ConversationRecord>, ChatError> {
        let filter = ConversationFilter::User(self.user_id.clone());
        Ok(store.list(&filter).await?)
    }

    /// Replace the local conversation with a saved one.
    pub async fn open(&mut self, store: &dyn ConversationStore, id: Uuid) -> Result<(), ChatError> {
        let record = store
            .get(id)
            .await?
            .ok_or(ChatError::ConversationNotFound(id))?;

        // The log wins only when it holds the whole conversation.
        let log = store.messages(id).await?;
        self.messages = if !log.is_empty() && log.len() >= record.messages.len() {
            log
        } else {
            record.messages
        };
        self.persist();
        Ok(())
    }

    /// Copy the agent message at `index` to the clipboard.
    ///
    /// A missing clipboard is reported as a notice, not an error.
    pub fn copy_message(&self, index: usize, clipboard: &dyn Clipboard) -> Result<Notice, ChatError> {
        let message = self
            .messages
            .get(index)
            .filter(|m| m.role == Role::Agent)
            .ok_or(ChatError::NoSuchMessage(index))?;

        Ok(match clipboard.write_text(&message.content) {
            Ok(()) => Notice::info("Copied to clipboard!"),
            Err(VoicioError::Unsupported(_)) => {
                Notice::warning("Clipboard is not available in this environment.")
            }
            Err(e) => Notice::warning(format!("Could not copy message: {}", e)),
        })
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.messages)
            .map_err(VoicioError::from)
            .and_then(|json| self.storage.set(MESSAGES_KEY, &json));
        if let Err(e) = result {
            tracing::warn!("Could not store messages: {}", e);
        }
    }
}
