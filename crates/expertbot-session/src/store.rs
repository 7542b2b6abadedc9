//! # Session Store
//!
//! Reads and writes the conversation archive and the dark-mode preference.
//! The archive is always rewritten whole.

use std::sync::Arc;

use expertbot_core::Session;
use tracing::{debug, warn};

use crate::error::StorageResult;
use crate::storage::SlotStorage;

/// Slot holding the JSON archive.
pub const CHAT_HISTORY_SLOT: &str = "chatHistory";

/// Slot holding the dark-mode preference.
pub const DARK_MODE_SLOT: &str = "darkMode";

#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn SlotStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SlotStorage>) -> Self {
        Self { storage }
    }

    /// Load the archive, most recent first.
    ///
    /// Absent, unreadable or malformed content yields an empty archive.
    pub async fn load(&self) -> Vec<Session> {
        let raw = match self.storage.get(CHAT_HISTORY_SLOT).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No chat history stored yet");
                return Vec::new();
            }
            Err(e) => {
                warn!("Failed to read chat history: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Session>>(&raw) {
            Ok(sessions) => {
                debug!("Loaded {} archived sessions", sessions.len());
                sessions
            }
            Err(e) => {
                warn!("Ignoring malformed chat history: {}", e);
                Vec::new()
            }
        }
    }

    /// Replace the archive with `sessions`.
    pub async fn persist(&self, sessions: &[Session]) -> StorageResult<()> {
        let raw = serde_json::to_string(sessions)?;
        self.storage.set(CHAT_HISTORY_SLOT, &raw).await?;
        debug!("Persisted {} sessions", sessions.len());
        Ok(())
    }

    /// Stored dark-mode preference. Anything but `"true"`/`"false"` reads as
    /// no preference.
    pub async fn load_dark_mode(&self) -> Option<bool> {
        match self.storage.get(DARK_MODE_SLOT).await {
            Ok(Some(raw)) => match raw.trim() {
                "true" => Some(true),
                "false" => Some(false),
                other => {
                    warn!("Ignoring unexpected dark mode value: {:?}", other);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read dark mode preference: {}", e);
                None
            }
        }
    }

    pub async fn save_dark_mode(&self, enabled: bool) -> StorageResult<()> {
        self.storage
            .set(DARK_MODE_SLOT, if enabled { "true" } else { "false" })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileSlotStorage, MemorySlotStorage};
    use chrono::Utc;
    use expertbot_core::Message;
    use tempfile::TempDir;

    fn sample_session(text: &str) -> Session {
        Session::new(vec![Message::welcome(), Message::user(text)], Utc::now())
    }

    #[tokio::test]
    async fn test_empty_when_absent() {
        let store = SessionStore::new(Arc::new(MemorySlotStorage::new()));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_history_loads_empty() {
        let storage = MemorySlotStorage::new().with_slot(CHAT_HISTORY_SLOT, "{not json");
        let store = SessionStore::new(Arc::new(storage));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_shape_loads_empty() {
        let storage = MemorySlotStorage::new().with_slot(CHAT_HISTORY_SLOT, r#"{"id":"x"}"#);
        let store = SessionStore::new(Arc::new(storage));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_persist_keeps_order() {
        let store = SessionStore::new(Arc::new(MemorySlotStorage::new()));
        let sessions = vec![sample_session("newest"), sample_session("oldest")];

        store.persist(&sessions).await.unwrap();
        let loaded = store.load().await;

        assert_eq!(loaded, sessions);
    }

    #[tokio::test]
    async fn test_history_uses_date_key() {
        let storage = Arc::new(MemorySlotStorage::new());
        let store = SessionStore::new(storage.clone());
        store.persist(&[sample_session("q")]).await.unwrap();

        let raw = storage.peek(CHAT_HISTORY_SLOT).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["date"], "Just now");
        assert_eq!(value[0]["messages"][1]["sender"], "user");
    }

    #[tokio::test]
    async fn test_file_history_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let sessions = vec![sample_session("persisted")];

        {
            let storage = FileSlotStorage::new(temp_dir.path()).await.unwrap();
            SessionStore::new(Arc::new(storage))
                .persist(&sessions)
                .await
                .unwrap();
        }

        let storage = FileSlotStorage::new(temp_dir.path()).await.unwrap();
        let loaded = SessionStore::new(Arc::new(storage)).load().await;
        assert_eq!(loaded, sessions);
    }

    #[tokio::test]
    async fn test_dark_mode_slot() {
        let store = SessionStore::new(Arc::new(MemorySlotStorage::new()));
        assert_eq!(store.load_dark_mode().await, None);

        store.save_dark_mode(true).await.unwrap();
        assert_eq!(store.load_dark_mode().await, Some(true));

        store.save_dark_mode(false).await.unwrap();
        assert_eq!(store.load_dark_mode().await, Some(false));
    }

    #[tokio::test]
    async fn test_garbage_dark_mode_reads_as_unset() {
        let storage = MemorySlotStorage::new().with_slot(DARK_MODE_SLOT, "maybe");
        let store = SessionStore::new(Arc::new(storage));
        assert_eq!(store.load_dark_mode().await, None);
    }
}
