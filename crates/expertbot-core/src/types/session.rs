use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::relative_label;
use crate::types::message::Message;

/// Unique session identifier
pub type SessionId = String;

/// Title used when a conversation has no user message yet.
pub const DEFAULT_TITLE: &str = "New conversation";

/// Number of characters of the first user message kept in a title.
pub const TITLE_MAX_CHARS: usize = 30;

/// An archived conversation.
///
/// The stored label is serialized under `date` so archives written by the
/// browser client load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub title: String,
    #[serde(rename = "date")]
    pub last_activity: String,
    /// Instant of the last save. Absent in archives written by older clients.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub messages: Vec<Message>,
}

impl Session {
    /// Archive `messages` as a brand new session saved at `now`.
    pub fn new(messages: Vec<Message>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: derive_title(&messages),
            last_activity: relative_label(now, now),
            updated_at: Some(now),
            messages,
        }
    }

    /// Replace messages, title and label wholesale.
    pub fn refresh(&mut self, messages: Vec<Message>, now: DateTime<Utc>) {
        self.title = derive_title(&messages);
        self.last_activity = relative_label(now, now);
        self.updated_at = Some(now);
        self.messages = messages;
    }

    /// Label relative to `now`; falls back to the stored label when the save
    /// instant is unknown.
    pub fn activity_label(&self, now: DateTime<Utc>) -> String {
        match self.updated_at {
            Some(saved) => relative_label(saved, now),
            None => self.last_activity.clone(),
        }
    }

    pub fn has_user_messages(&self) -> bool {
        self.messages.iter().any(Message::is_user)
    }
}

/// Title from the first user message: up to 30 characters, `...` appended
/// when cut, or [`DEFAULT_TITLE`] when there is no user message.
pub fn derive_title(messages: &[Message]) -> String {
    match messages.iter().find(|m| m.is_user()) {
        Some(first) => {
            let mut chars = first.content.chars();
            let prefix: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
            if chars.next().is_some() {
                format!("{}...", prefix)
            } else {
                prefix
            }
        }
        None => DEFAULT_TITLE.to_string(),
    }
}
