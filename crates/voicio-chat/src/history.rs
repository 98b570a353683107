//! Request payload for the language-model proxy.

use serde::{Deserialize, Serialize};

use voicio_core::types::{Message, Role};

use crate::prompts::tone_prompt;

/// Number of prior messages sent along with each new turn.
pub const DEFAULT_HISTORY_TURNS: usize = 5;

/// One role-tagged entry of the proxy request (`user` or `assistant`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyMessage {
    pub role: String,
    pub content: String,
}

impl ProxyMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role: role.as_proxy_role().to_string(),
            content: content.into(),
        }
    }
}

/// Build the message list for a new turn.
///
/// `prior` is the conversation before the new user message. Its last
/// `turns` entries are sent verbatim; the new turn carries the
/// tone-decorated prompt rather than the raw utterance.
pub fn build_payload(prior: &[Message], utterance: &str, tone: &str, turns: usize) -> Vec<ProxyMessage> {
    let start = prior.len().saturating_sub(turns);
    let mut payload: Vec<ProxyMessage> = prior[start..]
        .iter()
        .map(|m| ProxyMessage::new(m.role, m.content.clone()))
        .collect();
    payload.push(ProxyMessage::new(Role::User, tone_prompt(utterance, tone)));
    payload
}
