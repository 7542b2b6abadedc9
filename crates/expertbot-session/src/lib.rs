//! # ExpertBot Session Storage
//!
//! Conversation archive and the controller that owns the active
//! conversation.
//!
//! - **Slot storage**: named string slots, file-backed or in memory
//! - **Session store**: the JSON archive and the dark-mode preference
//! - **Session controller**: new / save / select / delete / append
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use expertbot_core::Message;
//! use expertbot_session::{FileSlotStorage, SessionController, SessionStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = FileSlotStorage::new("~/.expertbot/storage").await?;
//!     let mut controller = SessionController::open(SessionStore::new(Arc::new(storage))).await;
//!
//!     controller.append_message(Message::user("What are the leave rules?"));
//!     controller.save_active().await;
//!     Ok(())
//! }
//! ```

pub mod controller;
pub mod error;
pub mod storage;
pub mod store;

pub use controller::SessionController;
pub use error::{StorageError, StorageResult};
pub use storage::{FileSlotStorage, MemorySlotStorage, SlotStorage};
pub use store::{SessionStore, CHAT_HISTORY_SLOT, DARK_MODE_SLOT};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
