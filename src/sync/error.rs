//! Sync error types.

use thiserror::Error;

use crate::db::StorageError;
use crate::planner::{ImportError, PlanError};

/// Errors talking to a remote document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Sync not configured. Add server_url and api_key to config.")]
    NotConfigured,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unauthorized: check the sync api_key")]
    Unauthorized,

    #[error("Server rejected the request: {0}")]
    Rejected(String),

    #[error("Document too large for the remote store ({0} bytes)")]
    TooLarge(usize),

    #[error("Invalid remote document: {0}")]
    InvalidDocument(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Remote store is offline")]
    Offline,
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::InvalidDocument(err.to_string())
        } else {
            RemoteError::Connection(err.to_string())
        }
    }
}

/// Errors surfaced by [`SyncEngine`](super::SyncEngine) operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Local storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("No sync session is active")]
    NoSession,

    #[error("No document exists on the remote store yet")]
    RemoteDocumentMissing,
}
