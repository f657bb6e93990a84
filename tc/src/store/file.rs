//! File-backed session store
//!
//! One JSON document per session under the sessions directory:
//!
//! ```text
//! sessions/
//! ├── 019a42-task-send-email-to-sara.json
//! └── 019a43-task-buy-groceries.json
//! ```

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{SessionStore, StoreError};
use crate::domain::CaptureSession;

/// Session store writing one JSON file per task
pub struct FileSessionStore {
    base_path: PathBuf,
}

impl FileSessionStore {
    /// Open or create a store at the given directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        debug!(?base_path, "Opened session store");
        Ok(Self { base_path })
    }

    fn session_path(&self, task_id: &str) -> PathBuf {
        // Task ids are slug-safe by construction; guard anyway
        let safe: String = task_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe))
    }

    fn write(&self, session: &CaptureSession) -> Result<(), StoreError> {
        let path = self.session_path(&session.task_id);
        let content = serde_json::to_string_pretty(session)?;
        fs::write(&path, content)?;
        debug!(task_id = %session.task_id, "Session written");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, session: &CaptureSession) -> Result<(), StoreError> {
        self.write(session)
    }

    async fn update(&self, session: &CaptureSession) -> Result<(), StoreError> {
        self.write(session)
    }

    async fn load(&self, task_id: &str) -> Result<CaptureSession, StoreError> {
        let path = self.session_path(task_id);
        if !path.exists() {
            return Err(StoreError::NotFound(task_id.to_string()));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false)
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
