//! Remote document store interface and an in-process implementation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;

use super::error::RemoteError;
use crate::models::Document;

/// Hard size limit of a stored document.
pub const REMOTE_MAX_BYTES: usize = 1024 * 1024;

/// A notification delivered by a [`Subscription`].
#[derive(Debug, Clone)]
pub enum RemoteEvent {
    Changed(Document),
    Error(RemoteError),
}

/// Change feed for one user's document.
///
/// Dropping it unsubscribes.
pub struct Subscription {
    events: mpsc::Receiver<RemoteEvent>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Wraps a channel fed by `task`. The task is aborted on drop.
    pub fn new(events: mpsc::Receiver<RemoteEvent>, task: JoinHandle<()>) -> Self {
        Self {
            events,
            task: Some(task),
        }
    }

    pub fn from_channel(events: mpsc::Receiver<RemoteEvent>) -> Self {
        Self { events, task: None }
    }

    /// Next event, or `None` once the feed has closed.
    pub async fn next(&mut self) -> Option<RemoteEvent> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// A store holding one whole document per user id.
pub trait RemoteStore: Send + Sync + 'static {
    fn fetch(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<Document>, RemoteError>> + Send;

    /// Replaces the stored document.
    fn write(
        &self,
        user_id: &str,
        doc: &Document,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Subscribes to replacements of the user's document. The current
    /// document, if any, is delivered first.
    fn subscribe(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Subscription, RemoteError>> + Send;
}

type Feed = broadcast::Sender<Result<Document, RemoteError>>;

#[derive(Default)]
struct MemoryInner {
    docs: RwLock<HashMap<String, Document>>,
    feeds: RwLock<HashMap<String, Feed>>,
    offline: AtomicBool,
    writes: AtomicUsize,
}

/// In-process remote store. Clones share the same data, so several engines
/// can play different devices of one user.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<MemoryInner>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with [`RemoteError::Offline`].
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Reads the stored document without going through the offline check.
    pub async fn peek(&self, user_id: &str) -> Option<Document> {
        self.inner.docs.read().await.get(user_id).cloned()
    }

    /// Deletes the stored document without notifying subscribers.
    pub async fn remove(&self, user_id: &str) -> Option<Document> {
        self.inner.docs.write().await.remove(user_id)
    }

    /// Delivers an error to every subscriber of `user_id`.
    pub async fn fail_subscribers(&self, user_id: &str, err: RemoteError) {
        if let Some(feed) = self.inner.feeds.read().await.get(user_id) {
            let _ = feed.send(Err(err));
        }
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            Err(RemoteError::Offline)
        } else {
            Ok(())
        }
    }

    async fn feed(&self, user_id: &str) -> Feed {
        let mut feeds = self.inner.feeds.write().await;
        feeds
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(16).0)
            .clone()
    }
}

impl RemoteStore for MemoryRemote {
    async fn fetch(&self, user_id: &str) -> Result<Option<Document>, RemoteError> {
        self.check_online()?;
        Ok(self.inner.docs.read().await.get(user_id).cloned())
    }

    async fn write(&self, user_id: &str, doc: &Document) -> Result<(), RemoteError> {
        self.check_online()?;
        let bytes = serde_json::to_vec(doc)
            .map_err(|e| RemoteError::InvalidDocument(e.to_string()))?
            .len();
        if bytes > REMOTE_MAX_BYTES {
            return Err(RemoteError::TooLarge(bytes));
        }
        self.inner
            .docs
            .write()
            .await
            .insert(user_id.to_string(), doc.clone());
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(feed) = self.inner.feeds.read().await.get(user_id) {
            let _ = feed.send(Ok(doc.clone()));
        }
        Ok(())
    }

    async fn subscribe(&self, user_id: &str) -> Result<Subscription, RemoteError> {
        self.check_online()?;
        let mut changes = self.feed(user_id).await.subscribe();
        let (tx, rx) = mpsc::channel(16);
        if let Some(current) = self.inner.docs.read().await.get(user_id).cloned() {
            let _ = tx.send(RemoteEvent::Changed(current)).await;
        }

        let task = tokio::spawn(async move {
            loop {
                let event = match changes.recv().await {
                    Ok(Ok(doc)) => RemoteEvent::Changed(doc),
                    Ok(Err(err)) => RemoteEvent::Error(err),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(Subscription::new(rx, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_at(updated_at: i64) -> Document {
        let mut doc = Document::seed();
        doc.meta.updated_at = updated_at;
        doc
    }

    #[tokio::test]
    async fn test_fetch_missing_then_write() {
        let remote = MemoryRemote::new();
        assert!(remote.fetch("u1").await.unwrap().is_none());
        remote.write("u1", &doc_at(5)).await.unwrap();
        assert_eq!(remote.fetch("u1").await.unwrap().unwrap().updated_at(), 5);
        assert!(remote.fetch("u2").await.unwrap().is_none());
        assert_eq!(remote.writes(), 1);
    }

    #[tokio::test]
    async fn test_subscribe_delivers_current_then_changes() {
        let remote = MemoryRemote::new();
        remote.write("u1", &doc_at(1)).await.unwrap();
        let mut sub = remote.subscribe("u1").await.unwrap();

        match sub.next().await {
            Some(RemoteEvent::Changed(doc)) => assert_eq!(doc.updated_at(), 1),
            other => panic!("unexpected event: {:?}", other),
        }

        remote.write("u1", &doc_at(2)).await.unwrap();
        match sub.next().await {
            Some(RemoteEvent::Changed(doc)) => assert_eq!(doc.updated_at(), 2),
            other => panic!("unexpected event: {:?}", other),
        }

        remote.fail_subscribers("u1", RemoteError::Offline).await;
        assert!(matches!(
            sub.next().await,
            Some(RemoteEvent::Error(RemoteError::Offline))
        ));
    }

    #[tokio::test]
    async fn test_offline_rejects_calls() {
        let remote = MemoryRemote::new();
        remote.set_offline(true);
        assert_eq!(remote.fetch("u1").await.unwrap_err(), RemoteError::Offline);
        assert_eq!(
            remote.write("u1", &doc_at(1)).await.unwrap_err(),
            RemoteError::Offline
        );
        assert!(remote.subscribe("u1").await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_oversized_document() {
        let remote = MemoryRemote::new();
        let mut doc = doc_at(1);
        doc.profiles[0].name = "x".repeat(REMOTE_MAX_BYTES);
        assert!(matches!(
            remote.write("u1", &doc).await,
            Err(RemoteError::TooLarge(_))
        ));
        assert!(remote.peek("u1").await.is_none());
    }
}
