use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Author of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The person speaking or typing.
    User,
    /// The generative agent.
    Agent,
}

impl Role {
    /// Role name expected by the language-model proxy.
    pub fn as_proxy_role(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "assistant",
        }
    }

    /// Label shown next to a message bubble.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Agent => "Voicio",
        }
    }
}

/// Response-style modifier applied to every prompt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tone {
    Formal,
    Casual,
    Friendly,
    #[default]
    Default,
}

impl Tone {
    /// Parse a free-form label. Matching is case-insensitive and anything
    /// unrecognised becomes `Default`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "formal" => Tone::Formal,
            "casual" => Tone::Casual,
            "friendly" => Tone::Friendly,
            _ => Tone::Default,
        }
    }

    /// Canonical label, as stored in client-local storage.
    pub fn label(&self) -> &'static str {
        match self {
            Tone::Formal => "Formal",
            Tone::Casual => "Casual",
            Tone::Friendly => "Friendly",
            Tone::Default => "Default",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Severity of a user-visible notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

// =============================================================================
// Structs
// =============================================================================

/// One bubble in the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Display string, e.g. `4:08:37 PM`.
    pub timestamp: String,
}

impl Message {
    /// Create a message stamped with the current local time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: display_timestamp(Local::now()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(Role::Agent, content)
    }
}

/// A saved conversation. Created once per save and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: Uuid,
    pub user_id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl ConversationRecord {
    /// Build a new record for `user_id` with a fresh id and creation time.
    pub fn new(user_id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            messages,
            created_at: Utc::now(),
        }
    }

    /// First user message, trimmed to `max_chars`, for history listings.
    pub fn title(&self, max_chars: usize) -> String {
        let first = self
            .messages
            .iter()
            .find(|m| m.role == Role::User)
            .or_else(|| self.messages.first())
            .map(|m| m.content.trim())
            .unwrap_or("");
        if first.chars().count() <= max_chars {
            first.to_string()
        } else {
            let truncated: String = first.chars().take(max_chars).collect();
            format!("{}…", truncated)
        }
    }
}

/// Selects which conversation records a listing returns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConversationFilter {
    #[default]
    All,
    User(String),
}

/// A non-fatal, user-visible notification (alert or toast equivalent).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Format a time the way message bubbles show it (`4:08:37 PM`).
pub fn display_timestamp(at: DateTime<Local>) -> String {
    at.format("%-I:%M:%S %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_role_proxy_mapping() {
        assert_eq!(Role::User.as_proxy_role(), "user");
        assert_eq!(Role::Agent.as_proxy_role(), "assistant");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Agent).unwrap(), "\"agent\"");
        let role: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, Role::User);
    }

    #[test]
    fn test_tone_from_label() {
        assert_eq!(Tone::from_label("Formal"), Tone::Formal);
        assert_eq!(Tone::from_label("casual"), Tone::Casual);
        assert_eq!(Tone::from_label(" FRIENDLY "), Tone::Friendly);
        assert_eq!(Tone::from_label("sarcastic"), Tone::Default);
        assert_eq!(Tone::from_label(""), Tone::Default);
    }

    #[test]
    fn test_tone_label_round_trip() {
        for tone in [Tone::Formal, Tone::Casual, Tone::Friendly, Tone::Default] {
            assert_eq!(Tone::from_label(tone.label()), tone);
        }
    }

    #[test]
    fn test_message_json_shape() {
        let msg = Message {
            role: Role::User,
            content: "Hi, I'd like to check my bill.".to_string(),
            timestamp: "4:08:37 PM".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "Hi, I'd like to check my bill.");
        assert_eq!(json["timestamp"], "4:08:37 PM");
    }

    #[test]
    fn test_display_timestamp_format() {
        let at = Local.with_ymd_and_hms(2024, 8, 1, 16, 8, 28).unwrap();
        assert_eq!(display_timestamp(at), "4:08:28 PM");
        let morning = Local.with_ymd_and_hms(2024, 8, 1, 9, 5, 3).unwrap();
        assert_eq!(display_timestamp(morning), "9:05:03 AM");
    }

    #[test]
    fn test_record_title_prefers_first_user_message() {
        let record = ConversationRecord::new(
            "user-1",
            vec![
                Message::agent("Hello, how may I help?"),
                Message::user("What is the weather like on Mars today"),
            ],
        );
        assert_eq!(record.title(11), "What is the…");
        assert_eq!(record.title(100), "What is the weather like on Mars today");
    }

    #[test]
    fn test_record_title_empty() {
        let record = ConversationRecord::new("user-1", vec![]);
        assert_eq!(record.title(10), "");
    }

    #[test]
    fn test_notice_constructors() {
        assert_eq!(Notice::info("a").level, NoticeLevel::Info);
        assert_eq!(Notice::warning("b").level, NoticeLevel::Warning);
        assert_eq!(Notice::error("c").level, NoticeLevel::Error);
    }
}
