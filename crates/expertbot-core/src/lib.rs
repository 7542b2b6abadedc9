//! Conversation model shared by every ExpertBot crate.

pub mod greeting;
pub mod time;
pub mod types;

pub use greeting::{classify_greeting, respond_to_greeting, GREETINGS, GREETING_RESPONSES};
pub use time::relative_label;
pub use types::{
    derive_title, Message, MessageId, Sender, Session, SessionId, DEFAULT_TITLE, TITLE_MAX_CHARS,
    WELCOME_TEXT,
};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
