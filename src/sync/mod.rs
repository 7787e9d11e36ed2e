//! Synchronization of the planner document between this device and a
//! remote document store.
//!
//! Conflicts are resolved by whole-document last-write-wins on
//! `_meta.updatedAt`: there is no field-level merge.
//!
//! # Usage
//!
//! ```no_run
//! use macroplan::db::MemoryStore;
//! use macroplan::planner::profiles;
//! use macroplan::sync::{MemoryRemote, SyncEngine, SyncSettings};
//!
//! # async fn demo() -> Result<(), macroplan::sync::SyncError> {
//! let engine = SyncEngine::open(MemoryStore::new(), MemoryRemote::new(), SyncSettings::default()).await?;
//! engine.on_session_changed(Some("user-1".to_string())).await?;
//! engine.mutate(|doc| profiles::rename_profile(doc, "Cut 2026")).await?;
//! engine.flush().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod engine;
mod error;
pub mod remote;
mod status;

pub use client::HttpRemote;
pub use engine::{SyncEngine, SyncSettings};
pub use error::{RemoteError, SyncError};
pub use remote::{MemoryRemote, RemoteEvent, RemoteStore, Subscription, REMOTE_MAX_BYTES};
pub use status::{PushReport, SyncStatus};
