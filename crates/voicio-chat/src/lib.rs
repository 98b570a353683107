//! Voicio Chat crate - chat view, prompt templates, proxy client and the
//! session driver that ties them to the voice controller.

pub mod driver;
pub mod error;
pub mod history;
pub mod llm;
pub mod prompts;
pub mod view;

pub use driver::{
    event_channel, ChatCommand, ChatSession, ChatUpdate, EventReceiver, EventSender, SessionOptions,
    SessionPorts,
};
pub use error::ChatError;
pub use history::{build_payload, ProxyMessage, DEFAULT_HISTORY_TURNS};
pub use llm::{LanguageModel, ProxyClient};
pub use prompts::tone_prompt;
pub use view::{ChatView, APOLOGY};
