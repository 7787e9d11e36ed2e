//! Macroplan
//!
//! Macro-nutrient meal planning on a single JSON document, persisted locally
//! and kept in sync across devices with last-write-wins on `updatedAt`.

pub mod catalog;
pub mod config;
pub mod db;
pub mod export;
pub mod models;
pub mod planner;
pub mod server;
pub mod sync;

pub use config::{Config, ConfigError, SyncConfig};
pub use db::{LocalStore, MemoryStore, SqliteStore, StorageError};
pub use models::{Document, Food, MacroGroup, Macros, Meal, Profile};
pub use planner::{ImportError, PlanError};
pub use sync::{
    HttpRemote, MemoryRemote, RemoteError, RemoteStore, SyncEngine, SyncError, SyncSettings,
    SyncStatus,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
