use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique message identifier
pub type MessageId = String;

/// Text of the bot message every fresh conversation starts with.
pub const WELCOME_TEXT: &str =
    "Hello! I'm ExpertBot, a rule-based expert system. How can I assist you today?";

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Bot => write!(f, "bot"),
        }
    }
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    /// Create a bot message
    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(Sender::Bot, content)
    }

    /// The fixed greeting that seeds every new conversation.
    pub fn welcome() -> Self {
        Self::bot(WELCOME_TEXT)
    }

    fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        let msg = Message::user("Hello!");
        assert_eq!(msg.sender, Sender::User);
        assert_eq!(msg.content, "Hello!");
        assert!(msg.is_user());
    }

    #[test]
    fn test_bot_message() {
        let msg = Message::bot("Hi there");
        assert!(msg.is_bot());
        assert!(!msg.id.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Message::user("a");
        let b = Message::user("a");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_sender_serializes_lowercase() {
        let msg = Message::bot("x");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["sender"], "bot");
    }

    #[test]
    fn test_reads_browser_timestamps() {
        let raw = r#"{"id":"m1","content":"hi","sender":"user","timestamp":"2024-03-01T10:15:00.000Z"}"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.sender, Sender::User);
        assert_eq!(msg.timestamp.to_rfc3339(), "2024-03-01T10:15:00+00:00");
    }
}
