// src/session/mod.rs
// Process-local, non-persistent session memory. Lifecycle is bounded by
// the process; a session entry is created lazily on first use and cleared
// explicitly. Concurrent reads/writes to distinct sessions never conflict;
// callers are responsible for not running two loops against the same
// session concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::model::message::ChatMessage;

#[derive(Debug, Clone, Default)]
pub struct SessionMemory {
    inner: Arc<RwLock<HashMap<String, Vec<ChatMessage>>>>,
}

impl SessionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, session_id: &str) -> Vec<ChatMessage> {
        self.inner
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn put(&self, session_id: &str, history: Vec<ChatMessage>) {
        debug!(session_id, len = history.len(), "writing session history");
        self.inner
            .write()
            .await
            .insert(session_id.to_string(), history);
    }

    pub async fn clear(&self, session_id: &str) {
        debug!(session_id, "clearing session history");
        self.inner.write().await.remove(session_id);
    }
}
