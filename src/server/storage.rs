//! Server-side document storage.
//!
//! One JSON file per user:
//! ```text
//! <DATA_DIR>/
//!   <user_id>.json
//! ```

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::Document;

/// Errors that can occur during server storage operations.
#[derive(Debug, Error)]
pub enum ServerStorageError {
    #[error("I/O error for {}: {1}", .0.display())]
    Io(PathBuf, io::Error),

    #[error("Failed to parse document {}: {1}", .0.display())]
    Parse(PathBuf, serde_json::Error),

    #[error("Failed to serialize document: {0}")]
    Serialize(serde_json::Error),

    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),
}

/// Per-user document files under a data directory.
#[derive(Debug, Clone)]
pub struct ServerStorage {
    data_dir: PathBuf,
}

impl ServerStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Validates a user ID to prevent path traversal attacks.
    fn validate_user_id(user_id: &str) -> Result<(), ServerStorageError> {
        if user_id.is_empty()
            || user_id.contains('/')
            || user_id.contains('\\')
            || user_id.contains("..")
            || user_id.starts_with('.')
        {
            return Err(ServerStorageError::InvalidUserId(user_id.to_string()));
        }
        Ok(())
    }

    fn doc_path(&self, user_id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", user_id))
    }

    /// Returns `Ok(None)` if the user has no document yet.
    pub fn load(&self, user_id: &str) -> Result<Option<Document>, ServerStorageError> {
        Self::validate_user_id(user_id)?;
        let path = self.doc_path(user_id);

        match fs::read(&path) {
            Ok(bytes) => {
                let doc = serde_json::from_slice(&bytes)
                    .map_err(|e| ServerStorageError::Parse(path, e))?;
                Ok(Some(doc))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ServerStorageError::Io(path, e)),
        }
    }

    /// Replaces the user's document.
    pub fn save(&self, user_id: &str, doc: &Document) -> Result<(), ServerStorageError> {
        Self::validate_user_id(user_id)?;

        fs::create_dir_all(&self.data_dir)
            .map_err(|e| ServerStorageError::Io(self.data_dir.clone(), e))?;

        let path = self.doc_path(user_id);
        let bytes = serde_json::to_vec(doc).map_err(ServerStorageError::Serialize)?;

        // Write atomically using temp file + rename
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &bytes).map_err(|e| ServerStorageError::Io(temp_path.clone(), e))?;
        fs::rename(&temp_path, &path).map_err(|e| ServerStorageError::Io(path, e))?;

        Ok(())
    }

    pub fn exists(&self, user_id: &str) -> Result<bool, ServerStorageError> {
        Self::validate_user_id(user_id)?;
        Ok(self.doc_path(user_id).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (ServerStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = ServerStorage::new(temp_dir.path());
        (storage, temp_dir)
    }

    fn doc_named(name: &str) -> Document {
        let mut doc = Document::seed();
        doc.profiles[0].name = name.to_string();
        doc.stamp();
        doc
    }

    #[test]
    fn test_validate_user_id() {
        assert!(ServerStorage::validate_user_id("alice").is_ok());
        assert!(ServerStorage::validate_user_id("user-1_a").is_ok());

        assert!(ServerStorage::validate_user_id("").is_err());
        assert!(ServerStorage::validate_user_id("../evil").is_err());
        assert!(ServerStorage::validate_user_id("foo/bar").is_err());
        assert!(ServerStorage::validate_user_id("foo\\bar").is_err());
        assert!(ServerStorage::validate_user_id(".hidden").is_err());
    }

    #[test]
    fn test_load_nonexistent_returns_none() {
        let (storage, _temp) = setup();
        assert!(storage.load("alice").unwrap().is_none());
        assert!(!storage.exists("alice").unwrap());
    }

    #[test]
    fn test_save_overwrites_and_isolates_users() {
        let (storage, temp) = setup();
        storage.save("alice", &doc_named("First")).unwrap();
        storage.save("alice", &doc_named("Second")).unwrap();
        storage.save("bob", &doc_named("Bob")).unwrap();

        let alice = storage.load("alice").unwrap().unwrap();
        assert_eq!(alice.current_profile().unwrap().name, "Second");
        let bob = storage.load("bob").unwrap().unwrap();
        assert_eq!(bob.current_profile().unwrap().name, "Bob");
        assert!(temp.path().join("alice.json").exists());
        assert!(!temp.path().join("alice.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let (storage, temp) = setup();
        fs::write(temp.path().join("alice.json"), b"{broken").unwrap();
        assert!(matches!(
            storage.load("alice"),
            Err(ServerStorageError::Parse(_, _))
        ));
    }

    #[test]
    fn test_invalid_user_rejected_on_save() {
        let (storage, _temp) = setup();
        assert!(matches!(
            storage.save("../x", &Document::seed()),
            Err(ServerStorageError::InvalidUserId(_))
        ));
    }
}
