//! # Slot Storage
//!
//! Durable storage as named string slots, the same shape as browser
//! `localStorage`: a slot is read whole and replaced whole.
//!
//! ```text
//! <base_path>/
//! ├── chatHistory      # JSON archive
//! └── darkMode         # "true" / "false"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// Named string slots
#[async_trait]
pub trait SlotStorage: Send + Sync {
    /// Read a slot. `None` when it was never written.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace a slot's content.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;
}

/// One file per slot under a base directory.
#[derive(Debug, Clone)]
pub struct FileSlotStorage {
    base_path: PathBuf,
}

impl FileSlotStorage {
    /// Open (and create) the slot directory. A leading `~` is expanded.
    pub async fn new(base_path: impl AsRef<Path>) -> StorageResult<Self> {
        let raw = base_path.as_ref().to_string_lossy();
        let expanded = shellexpand::tilde(&raw).into_owned();
        let base_path = PathBuf::from(expanded);

        fs::create_dir_all(&base_path).await?;
        debug!("Slot storage opened at {:?}", base_path);

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn slot_path(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::other(format!("Invalid slot name: {:?}", key)));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl SlotStorage for FileSlotStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.slot_path(key)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.slot_path(key)?;
        let temp_path = self
            .base_path
            .join(format!(".{}.{}.tmp", key, uuid::Uuid::new_v4()));

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(value.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!("Slot {} written ({} bytes)", key, value.len());
        Ok(())
    }
}

/// In-process slots for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemorySlotStorage {
    slots: RwLock<HashMap<String, String>>,
    read_only: AtomicBool,
}

impl MemorySlotStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a slot.
    pub fn with_slot(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.slots.write().insert(key.into(), value.into());
        self
    }

    /// Make every subsequent `set` fail, simulating a full or locked disk.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Current slot content, bypassing the async interface.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.slots.read().get(key).cloned()
    }
}

#[async_trait]
impl SlotStorage for MemorySlotStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.slots.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StorageError::other(format!("Slot {} is read-only", key)));
        }
        self.slots.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_slot_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileSlotStorage::new(temp_dir.path()).await.unwrap();
        assert!(storage.get("chatHistory").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileSlotStorage::new(temp_dir.path()).await.unwrap();

        storage.set("darkMode", "true").await.unwrap();
        storage.set("darkMode", "false").await.unwrap();

        assert_eq!(storage.get("darkMode").await.unwrap().as_deref(), Some("false"));
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileSlotStorage::new(temp_dir.path()).await.unwrap();
        storage.set("chatHistory", "[]").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["chatHistory".to_string()]);
    }

    #[tokio::test]
    async fn test_rejects_path_like_slot_names() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileSlotStorage::new(temp_dir.path()).await.unwrap();
        assert!(storage.set("../escape", "x").await.is_err());
        assert!(storage.get("").await.is_err());
    }

    #[tokio::test]
    async fn test_creates_nested_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        let storage = FileSlotStorage::new(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert_eq!(storage.base_path(), nested.as_path());
    }

    #[tokio::test]
    async fn test_memory_read_only() {
        let storage = MemorySlotStorage::new().with_slot("darkMode", "true");
        storage.set_read_only(true);

        assert!(storage.set("darkMode", "false").await.is_err());
        assert_eq!(storage.peek("darkMode").as_deref(), Some("true"));
    }
}
