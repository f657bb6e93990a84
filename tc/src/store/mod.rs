//! Session persistence boundary
//!
//! The pipeline itself is stateless; whatever needs to survive between the
//! capture call and the clarify call goes through `SessionStore`. Concurrent
//! writes to the same task are resolved last-write-wins, which is acceptable
//! because clarification answers are additive and idempotent per field.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::CaptureSession;

mod file;

pub use file::FileSessionStore;

/// Errors at the persistence boundary
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Session not found: {0}")]
    NotFound(String),
}

/// Stores capture sessions between the capture and clarify calls
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a freshly finalized session
    async fn save(&self, session: &CaptureSession) -> Result<(), StoreError>;

    /// Persist a re-finalized session (last-write-wins)
    async fn update(&self, session: &CaptureSession) -> Result<(), StoreError>;

    /// Load a session by task id
    async fn load(&self, task_id: &str) -> Result<CaptureSession, StoreError>;

    /// All stored task ids
    async fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// In-memory store for tests and embedded use
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, CaptureSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: &CaptureSession) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session.task_id.clone(), session.clone());
        Ok(())
    }

    async fn update(&self, session: &CaptureSession) -> Result<(), StoreError> {
        self.save(session).await
    }

    async fn load(&self, task_id: &str) -> Result<CaptureSession, StoreError> {
        self.sessions
            .read()
            .await
            .get(task_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
