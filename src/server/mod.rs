//! Reference remote document store served by `macroplan-server`.

pub mod hub;
pub mod routes;
pub mod storage;

pub use hub::DocumentHub;
pub use routes::{router, ApiKeyStore, AppState, AuthUser, MAX_DOCUMENT_BYTES};
pub use storage::{ServerStorage, ServerStorageError};
