use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{decode, LocalStore, StorageError};
use crate::models::Document;

/// Keeps the serialized document in memory. Used by tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    value: Mutex<Option<String>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with an arbitrary raw value.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(raw.into())),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn with_document(doc: &Document) -> Result<Self, StorageError> {
        Ok(Self::with_raw(serde_json::to_string(doc)?))
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn raw(&self) -> Option<String> {
        self.value.lock().ok().and_then(|v| v.clone())
    }
}

impl LocalStore for MemoryStore {
    async fn read(&self) -> Result<Option<Document>, StorageError> {
        let value = self.value.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(value.as_deref().and_then(decode))
    }

    async fn write(&self, doc: &Document) -> Result<(), StorageError> {
        let serialized = serde_json::to_string(doc)?;
        *self.value.lock().map_err(|_| StorageError::Poisoned)? = Some(serialized);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.value.lock().map_err(|_| StorageError::Poisoned)? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_and_write_count() {
        let store = MemoryStore::new();
        assert!(store.read().await.unwrap().is_none());
        let doc = Document::seed();
        store.write(&doc).await.unwrap();
        assert_eq!(store.read().await.unwrap().unwrap(), doc);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_raw_value() {
        let store = MemoryStore::with_raw("][");
        assert!(store.read().await.unwrap().is_none());
    }
}
