//! HTTP/WebSocket client for the `macroplan-server` document store.
//!
//! Documents are read and replaced with plain HTTP requests. Change
//! notifications arrive over a WebSocket as JSON text frames.

use futures::{SinkExt, StreamExt};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

use super::error::RemoteError;
use super::remote::{RemoteEvent, RemoteStore, Subscription};
use crate::config::SyncConfig;
use crate::models::Document;

#[derive(Debug, Deserialize)]
struct Identity {
    user_id: String,
}

/// Remote store backed by the reference server.
#[derive(Clone)]
pub struct HttpRemote {
    server_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl HttpRemote {
    /// Creates a new client from config.
    ///
    /// Returns an error if sync is not configured.
    pub fn from_config(config: &SyncConfig) -> Result<Self, RemoteError> {
        let server_url = config
            .server_url
            .clone()
            .ok_or(RemoteError::NotConfigured)?;
        let api_key = config.api_key.clone().ok_or(RemoteError::NotConfigured)?;
        Ok(Self::new(server_url, api_key))
    }

    pub fn new(server_url: String, api_key: String) -> Self {
        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            api_key,
            http: reqwest::Client::new(),
        }
    }

    /// The user id the API key belongs to.
    pub async fn identity(&self) -> Result<String, RemoteError> {
        let response = self
            .http
            .get(format!("{}/me", self.http_base()))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let identity: Identity = check(response).await?.json().await?;
        Ok(identity.user_id)
    }

    pub async fn check_health(&self) -> Result<(), RemoteError> {
        let response = self
            .http
            .get(format!("{}/health", self.http_base()))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Server URL with an http(s) scheme.
    fn http_base(&self) -> String {
        if let Some(rest) = self.server_url.strip_prefix("ws://") {
            format!("http://{}", rest)
        } else if let Some(rest) = self.server_url.strip_prefix("wss://") {
            format!("https://{}", rest)
        } else if !self.server_url.starts_with("http://")
            && !self.server_url.starts_with("https://")
        {
            format!("http://{}", self.server_url)
        } else {
            self.server_url.clone()
        }
    }

    fn document_url(&self, user_id: &str) -> String {
        format!(
            "{}/users/{}/document",
            self.http_base(),
            urlencoding::encode(user_id)
        )
    }

    /// Builds the WebSocket URL for a user's change feed.
    fn build_ws_url(&self, user_id: &str) -> String {
        // Convert http(s) to ws(s) if needed
        let base_url = if self.server_url.starts_with("http://") {
            self.server_url.replacen("http://", "ws://", 1)
        } else if self.server_url.starts_with("https://") {
            self.server_url.replacen("https://", "wss://", 1)
        } else if !self.server_url.starts_with("ws://") && !self.server_url.starts_with("wss://") {
            format!("ws://{}", self.server_url)
        } else {
            self.server_url.clone()
        };

        format!(
            "{}/users/{}/subscribe?key={}",
            base_url,
            urlencoding::encode(user_id),
            urlencoding::encode(&self.api_key)
        )
    }
}

/// Maps error statuses onto [`RemoteError`].
async fn check(response: Response) -> Result<Response, RemoteError> {
    match response.status() {
        s if s.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::Unauthorized),
        StatusCode::PAYLOAD_TOO_LARGE => Err(RemoteError::TooLarge(
            response.content_length().unwrap_or_default() as usize,
        )),
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(RemoteError::Rejected(format!("{}: {}", status, body)))
        }
    }
}

fn decode_frame(text: &str) -> RemoteEvent {
    match serde_json::from_str::<Document>(text) {
        Ok(doc) => RemoteEvent::Changed(doc),
        Err(e) => RemoteEvent::Error(RemoteError::InvalidDocument(e.to_string())),
    }
}

impl RemoteStore for HttpRemote {
    async fn fetch(&self, user_id: &str) -> Result<Option<Document>, RemoteError> {
        let response = self
            .http
            .get(self.document_url(user_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc = check(response).await?.json().await?;
        Ok(Some(doc))
    }

    async fn write(&self, user_id: &str, doc: &Document) -> Result<(), RemoteError> {
        let body =
            serde_json::to_vec(doc).map_err(|e| RemoteError::InvalidDocument(e.to_string()))?;
        let bytes = body.len();
        let response = self
            .http
            .put(self.document_url(user_id))
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        match check(response).await {
            Err(RemoteError::TooLarge(_)) => Err(RemoteError::TooLarge(bytes)),
            other => other.map(|_| ()),
        }
    }

    async fn subscribe(&self, user_id: &str) -> Result<Subscription, RemoteError> {
        let ws_url = self.build_ws_url(user_id);
        let (ws_stream, _) = connect_async(ws_url.as_str())
            .await
            .map_err(|e| RemoteError::Connection(e.to_string()))?;
        debug!(user_id = %user_id, "Subscribed to remote changes");

        let (mut sender, mut receiver) = ws_stream.split();
        let (tx, rx) = mpsc::channel(16);

        let task = tokio::spawn(async move {
            loop {
                let event = match receiver.next().await {
                    Some(Ok(Message::Text(text))) => decode_frame(text.as_str()),
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            warn!(error = %e, "Failed to answer ping");
                        }
                        continue;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        let _ = tx
                            .send(RemoteEvent::Error(RemoteError::WebSocket(
                                "connection closed".to_string(),
                            )))
                            .await;
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        let _ = tx
                            .send(RemoteEvent::Error(RemoteError::WebSocket(e.to_string())))
                            .await;
                        break;
                    }
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            let _ = sender.send(Message::Close(None)).await;
        });

        Ok(Subscription::new(rx, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_ws_url_with_ws() {
        let client = HttpRemote::new("ws://localhost:8080".to_string(), "test-key".to_string());
        let url = client.build_ws_url("alice");
        assert_eq!(url, "ws://localhost:8080/users/alice/subscribe?key=test-key");
    }

    #[test]
    fn test_build_ws_url_with_http() {
        let client = HttpRemote::new("http://localhost:8080/".to_string(), "test-key".to_string());
        let url = client.build_ws_url("alice");
        assert_eq!(url, "ws://localhost:8080/users/alice/subscribe?key=test-key");
    }

    #[test]
    fn test_build_ws_url_with_https() {
        let client = HttpRemote::new(
            "https://plan.example.com".to_string(),
            "test-key".to_string(),
        );
        let url = client.build_ws_url("alice");
        assert_eq!(url, "wss://plan.example.com/users/alice/subscribe?key=test-key");
    }

    #[test]
    fn test_build_ws_url_bare_host_encodes_parts() {
        let client = HttpRemote::new("localhost:8080".to_string(), "k&y".to_string());
        let url = client.build_ws_url("a b");
        assert_eq!(url, "ws://localhost:8080/users/a%20b/subscribe?key=k%26y");
    }

    #[test]
    fn test_document_url_uses_http_scheme() {
        let client = HttpRemote::new("wss://plan.example.com".to_string(), "k".to_string());
        assert_eq!(
            client.document_url("alice"),
            "https://plan.example.com/users/alice/document"
        );
        let bare = HttpRemote::new("localhost:8080".to_string(), "k".to_string());
        assert_eq!(bare.http_base(), "http://localhost:8080");
    }

    #[test]
    fn test_from_config_requires_url_and_key() {
        let config = SyncConfig {
            server_url: Some("http://localhost:8080".into()),
            ..SyncConfig::default()
        };
        assert!(matches!(
            HttpRemote::from_config(&config),
            Err(RemoteError::NotConfigured)
        ));
    }

    #[test]
    fn test_decode_frame() {
        let doc = Document::seed();
        let text = serde_json::to_string(&doc).unwrap();
        assert!(matches!(decode_frame(&text), RemoteEvent::Changed(d) if d == doc));
        assert!(matches!(
            decode_frame("nope"),
            RemoteEvent::Error(RemoteError::InvalidDocument(_))
        ));
    }
}
