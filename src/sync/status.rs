use std::fmt;

use chrono::{Local, TimeZone};

/// User-visible sync state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// No session; local storage only.
    Disabled,
    Connecting,
    /// The remote document was newer and replaced local state at session start.
    Restored,
    InSync,
    /// A push reached the remote store.
    Saved { at: i64 },
    UpdatedFromRemote { at: i64 },
    ForcePulled { at: i64 },
    /// Advisory: the document is close to the remote size limit.
    Oversize { bytes: usize },
    Error(String),
}

impl SyncStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, SyncStatus::Error(_))
    }
}

fn clock(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        None => millis.to_string(),
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Disabled => write!(f, "Sync off: local storage only"),
            SyncStatus::Connecting => write!(f, "Connecting to the remote store..."),
            SyncStatus::Restored => write!(f, "Restored from the remote store"),
            SyncStatus::InSync => write!(f, "In sync"),
            SyncStatus::Saved { at } => write!(f, "Saved at {}", clock(*at)),
            SyncStatus::UpdatedFromRemote { at } => {
                write!(f, "Updated from another device at {}", clock(*at))
            }
            SyncStatus::ForcePulled { at } => write!(f, "Pulled remote copy from {}", clock(*at)),
            SyncStatus::Oversize { bytes } => write!(
                f,
                "Document is very large ({} KB); consider splitting the data",
                bytes / 1024
            ),
            SyncStatus::Error(e) => write!(f, "Sync error: {}", e),
        }
    }
}

/// Outcome of one push attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport {
    /// `updatedAt` of the pushed document.
    pub updated_at: i64,
    /// Encoded size in bytes.
    pub bytes: usize,
    pub oversize: bool,
    pub error: Option<String>,
}

impl PushReport {
    pub fn ok(&self) -> bool {
        self.error.is_none()
    }
}
