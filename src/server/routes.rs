//! HTTP and WebSocket routes of the document store.

use std::collections::HashMap;
use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        DefaultBodyLimit, Path, Query, Request, State,
    },
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tower_http::trace::TraceLayer;

use super::hub::DocumentHub;
use super::storage::{ServerStorage, ServerStorageError};
use crate::models::Document;

/// Largest accepted document body.
pub const MAX_DOCUMENT_BYTES: usize = 1024 * 1024;

/// API key entry in config
#[derive(Debug, Clone, Deserialize)]
struct ApiKeyEntry {
    key: String,
    user_id: String,
}

/// Config file structure
#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    api_keys: Vec<ApiKeyEntry>,
}

/// Authenticated user info, added to request extensions after auth
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: String,
}

/// API key store - maps key -> AuthUser
#[derive(Debug, Clone, Default)]
pub struct ApiKeyStore {
    keys: HashMap<String, AuthUser>,
}

impl ApiKeyStore {
    /// Load API keys from config file. A missing or unreadable file yields
    /// an empty store.
    pub fn load(config_path: &FsPath) -> Self {
        match std::fs::read_to_string(config_path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(store) => {
                    tracing::info!("Loaded {} API key(s)", store.keys.len());
                    store
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}",
                    config_path.display(),
                    e
                );
                tracing::warn!("No API keys loaded - all authenticated requests will fail");
                Self::default()
            }
        }
    }

    pub fn parse(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let config: ConfigFile = serde_yaml::from_str(yaml)?;
        let keys = config
            .api_keys
            .into_iter()
            .map(|entry| {
                (
                    entry.key,
                    AuthUser {
                        user_id: entry.user_id,
                    },
                )
            })
            .collect();
        Ok(Self { keys })
    }

    /// Validate an API key and return the associated user
    pub fn validate(&self, key: &str) -> Option<AuthUser> {
        self.keys.get(key).cloned()
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    api_keys: Arc<ApiKeyStore>,
    storage: Arc<RwLock<ServerStorage>>,
    hub: Arc<DocumentHub>,
}

impl AppState {
    pub fn new(api_keys: ApiKeyStore, storage: ServerStorage) -> Self {
        Self {
            api_keys: Arc::new(api_keys),
            storage: Arc::new(RwLock::new(storage)),
            hub: Arc::new(DocumentHub::new()),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ApiError {
    error: &'static str,
    message: String,
}

fn api_error(status: StatusCode, error: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiError {
            error,
            message: message.into(),
        }),
    )
        .into_response()
}

fn storage_error(e: ServerStorageError) -> Response {
    match e {
        ServerStorageError::InvalidUserId(id) => {
            api_error(StatusCode::BAD_REQUEST, "invalid_user", format!("Invalid user ID: {}", id))
        }
        e => {
            tracing::error!("Storage error: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "storage", e.to_string())
        }
    }
}

/// Authentication middleware
async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let api_key = match auth_header {
        Some(h) => match h.strip_prefix("Bearer ") {
            Some(key) => key,
            None => {
                return api_error(
                    StatusCode::UNAUTHORIZED,
                    "invalid_auth",
                    "Authorization header must use Bearer scheme",
                )
            }
        },
        None => {
            return api_error(
                StatusCode::UNAUTHORIZED,
                "missing_auth",
                "Authorization header required",
            )
        }
    };

    match state.api_keys.validate(api_key) {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => api_error(StatusCode::UNAUTHORIZED, "invalid_key", "Invalid API key"),
    }
}

fn ensure_owner(user: &AuthUser, user_id: &str) -> Result<(), Response> {
    if user.user_id == user_id {
        Ok(())
    } else {
        Err(api_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "API key does not grant access to this document",
        ))
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct MeResponse {
    user_id: String,
}

async fn me(Extension(user): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.user_id,
    })
}

async fn get_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Response {
    if let Err(response) = ensure_owner(&user, &user_id) {
        return response;
    }
    let loaded = state.storage.read().await.load(&user_id);
    match loaded {
        Ok(Some(doc)) => Json(doc).into_response(),
        Ok(None) => api_error(StatusCode::NOT_FOUND, "not_found", "No document stored yet"),
        Err(e) => storage_error(e),
    }
}

async fn put_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    Json(doc): Json<Document>,
) -> Response {
    if let Err(response) = ensure_owner(&user, &user_id) {
        return response;
    }

    // Hold the write lock across save and broadcast so subscribers see
    // replacements in storage order.
    let storage = state.storage.write().await;
    if let Err(e) = storage.save(&user_id, &doc) {
        return storage_error(e);
    }
    tracing::info!(user_id = %user_id, updated_at = doc.updated_at(), "Stored document");
    state.hub.broadcast(&user_id, doc).await;
    drop(storage);

    StatusCode::NO_CONTENT.into_response()
}

#[derive(Deserialize)]
struct SubscribeParams {
    key: String,
}

/// WebSocket change feed. Authenticated with the `key` query parameter.
async fn subscribe(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<SubscribeParams>,
) -> Response {
    let Some(user) = state.api_keys.validate(&params.key) else {
        return api_error(StatusCode::UNAUTHORIZED, "invalid_key", "Invalid API key");
    };
    if let Err(response) = ensure_owner(&user, &user_id) {
        return response;
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

async fn send_document(socket: &mut WebSocket, doc: &Document) -> Result<(), axum::Error> {
    let text = serde_json::to_string(doc).map_err(axum::Error::new)?;
    socket.send(Message::Text(text.into())).await
}

async fn handle_socket(mut socket: WebSocket, state: AppState, user_id: String) {
    let mut updates = state.hub.subscribe(&user_id).await;
    tracing::debug!(user_id = %user_id, "Subscriber connected");

    let current = state.storage.read().await.load(&user_id);
    match current {
        Ok(Some(doc)) => {
            if let Err(e) = send_document(&mut socket, &doc).await {
                tracing::warn!("Failed to send current document: {}", e);
                return;
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Failed to load document for {}: {}", user_id, e),
    }

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(doc) => {
                    if send_document(&mut socket, &doc).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %user_id, skipped, "Subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::debug!(user_id = %user_id, "Subscriber disconnected");
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/users/{user_id}/subscribe", get(subscribe));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/me", get(me))
        .route(
            "/users/{user_id}/document",
            get(get_document).put(put_document),
        )
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
