pub mod message;
pub mod session;

pub use message::{Message, MessageId, Sender, WELCOME_TEXT};
pub use session::{derive_title, Session, SessionId, DEFAULT_TITLE, TITLE_MAX_CHARS};
