//! Snapshot persistence.
//!
//! # Design Decisions
//! - One slot per session holding the latest snapshot as JSON
//! - Last write wins; no coupling with the in-memory history
//! - Callers treat every error as "no snapshot" / "write skipped"

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::health::snapshot::HealthSnapshot;

/// Errors raised by a snapshot store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt snapshot: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A single durable slot for the latest snapshot.
pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> Result<Option<HealthSnapshot>, StoreError>;
    fn save(&self, snapshot: &HealthSnapshot) -> Result<(), StoreError>;
}

/// Stores the snapshot in `<dir>/snapshot-<session>.json`.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
    session_id: String,
}

impl FileSnapshotStore {
    pub fn new(dir: impl AsRef<Path>, session_id: &str) -> Self {
        let safe: String = session_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        Self {
            path: dir.as_ref().join(format!("snapshot-{}.json", safe)),
            session_id: session_id.to_string(),
        }
    }

    /// Use the configured session, or start a new one.
    pub fn from_config(config: &StorageConfig) -> Self {
        let session_id = config
            .session_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self::new(&config.dir, &session_id)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<HealthSnapshot>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn save(&self, snapshot: &HealthSnapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename so readers never see a torn file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(snapshot)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process slot holding the serialized snapshot.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with raw slot contents, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        self.slot.lock().expect("snapshot slot mutex poisoned").clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<HealthSnapshot>, StoreError> {
        let slot = self.slot.lock().expect("snapshot slot mutex poisoned");
        match slot.as_deref() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, snapshot: &HealthSnapshot) -> Result<(), StoreError> {
        let raw = serde_json::to_string(snapshot)?;
        *self.slot.lock().expect("snapshot slot mutex poisoned") = Some(raw);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::snapshot::HealthStatus;

    fn online(timestamp: u64) -> HealthSnapshot {
        HealthSnapshot {
            timestamp,
            status: HealthStatus::Online,
            latency_ms: Some(42),
            error: None,
            error_type: None,
            diagnostics: None,
            fallback_active: false,
            endpoint: Some("http://localhost/health".into()),
        }
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySnapshotStore::new();
        assert!(store.load().unwrap().is_none());

        store.save(&online(1)).unwrap();
        store.save(&online(2)).unwrap();
        assert_eq!(store.load().unwrap().unwrap().timestamp, 2);
    }

    #[test]
    fn test_memory_store_corrupt() {
        let store = MemorySnapshotStore::with_raw("{not json");
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_file_store_persistence() {
        let dir = std::env::temp_dir().join(format!("health-watch-test-{}", Uuid::new_v4()));
        let store = FileSnapshotStore::new(&dir, "session/one");
        assert!(store.path().ends_with("snapshot-session_one.json"));
        assert!(store.load().unwrap().is_none());

        store.save(&online(99)).unwrap();

        // A second handle on the same session sees the write
        let reopened = FileSnapshotStore::new(&dir, "session/one");
        assert_eq!(reopened.load().unwrap(), Some(online(99)));

        // Another session does not
        assert!(FileSnapshotStore::new(&dir, "other").load().unwrap().is_none());

        fs::write(store.path(), b"garbage").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));

        fs::remove_dir_all(&dir).unwrap_or_default();
    }

    #[test]
    fn test_generated_session_id() {
        let config = StorageConfig::default();
        let a = FileSnapshotStore::from_config(&config);
        let b = FileSnapshotStore::from_config(&config);
        assert_ne!(a.session_id(), b.session_id());
    }
}
