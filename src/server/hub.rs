//! Fan-out of document replacements to connected subscribers.

use std::collections::HashMap;

use tokio::sync::{broadcast, RwLock};

use crate::models::Document;

/// Tracks subscribers per user for broadcasting updates.
pub struct DocumentHub {
    channels: RwLock<HashMap<String, broadcast::Sender<Document>>>,
}

impl DocumentHub {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribes to replacements of a user's document.
    pub async fn subscribe(&self, user_id: &str) -> broadcast::Receiver<Document> {
        let mut channels = self.channels.write().await;

        if let Some(sender) = channels.get(user_id) {
            sender.subscribe()
        } else {
            // Create new channel with buffer of 16 messages
            let (sender, receiver) = broadcast::channel(16);
            channels.insert(user_id.to_string(), sender);
            receiver
        }
    }

    /// Sends a new document to every subscriber of `user_id`.
    pub async fn broadcast(&self, user_id: &str, doc: Document) {
        let channels = self.channels.read().await;

        if let Some(sender) = channels.get(user_id) {
            // Ignore send errors (no subscribers)
            let _ = sender.send(doc);
        }
    }
}

impl Default for DocumentHub {
    fn default() -> Self {
        Self::new()
    }
}
