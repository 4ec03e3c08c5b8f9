//! Configuration file watcher for hot reload.
//!
//! Every reload is re-validated and stamped with the pinned session id, so a
//! rebuilt poller keeps reading the snapshot slot of the running process.
//! Editors often emit several events per save, and some truncate the file
//! first; identical or empty content is therefore skipped.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{parse_config, ConfigError};
use crate::config::schema::WatchConfig;

/// What a single reload attempt did.
#[derive(Debug)]
pub enum ReloadOutcome {
    /// A new validated config was sent.
    Applied,
    /// Content matches the last applied version, or the file is empty.
    Unchanged,
    /// The file could not be read or failed validation; nothing was sent.
    Rejected(ConfigError),
}

/// Monitors the configuration file and sends validated updates.
pub struct ConfigWatcher {
    path: PathBuf,
    session_id: Option<String>,
    last_applied: Option<String>,
    update_tx: mpsc::UnboundedSender<WatchConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configuration updates.
    ///
    /// The file's current content counts as already applied.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<WatchConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                session_id: None,
                last_applied: fs::read_to_string(path).ok(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Stamp every reloaded config with this storage session.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Re-read the file and send the config if it changed.
    pub fn reload(&mut self) -> ReloadOutcome {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => return ReloadOutcome::Rejected(e.into()),
        };
        if content.trim().is_empty() || self.last_applied.as_deref() == Some(content.as_str()) {
            return ReloadOutcome::Unchanged;
        }

        let mut config = match parse_config(&content) {
            Ok(config) => config,
            Err(e) => return ReloadOutcome::Rejected(e),
        };
        if let Some(session_id) = &self.session_id {
            config.storage.session_id = Some(session_id.clone());
        }

        self.last_applied = Some(content);
        let _ = self.update_tx.send(config);
        ReloadOutcome::Applied
    }

    /// Start watching the file. The returned handle must be kept alive.
    pub fn run(mut self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => match self.reload() {
                    ReloadOutcome::Applied => {
                        tracing::info!(path = ?self.path, "Config file reloaded");
                    }
                    ReloadOutcome::Unchanged => {
                        tracing::debug!(path = ?self.path, "Config file unchanged, skipping reload");
                    }
                    ReloadOutcome::Rejected(e) => {
                        tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                    }
                },
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INITIAL: &str = "[poller]\nendpoint = \"http://127.0.0.1:8000/health\"\n";
    const UPDATED: &str = "[poller]\nendpoint = \"http://127.0.0.1:9000/health\"\npoll_interval_ms = 5000\n";

    fn temp_config(content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("health-watch-config-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("watch.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_reload_sends_validated_config_with_session() {
        let path = temp_config(INITIAL);
        let (watcher, mut rx) = ConfigWatcher::new(&path);
        let mut watcher = watcher.with_session("pinned");

        // Initial content is already applied
        assert!(matches!(watcher.reload(), ReloadOutcome::Unchanged));
        assert!(rx.try_recv().is_err());

        fs::write(&path, UPDATED).unwrap();
        assert!(matches!(watcher.reload(), ReloadOutcome::Applied));
        let config = rx.try_recv().unwrap();
        assert_eq!(config.poller.endpoint, "http://127.0.0.1:9000/health");
        assert_eq!(config.poller.poll_interval_ms, 5000);
        assert_eq!(config.storage.session_id.as_deref(), Some("pinned"));

        // A duplicate event for the same save
        assert!(matches!(watcher.reload(), ReloadOutcome::Unchanged));
        assert!(rx.try_recv().is_err());

        fs::remove_dir_all(path.parent().unwrap()).unwrap_or_default();
    }

    #[test]
    fn test_reload_skips_truncated_and_invalid() {
        let path = temp_config(INITIAL);
        let (mut watcher, mut rx) = ConfigWatcher::new(&path);

        fs::write(&path, "").unwrap();
        assert!(matches!(watcher.reload(), ReloadOutcome::Unchanged));

        fs::write(&path, "[poller]\nendpoint = \"ftp://nope\"\n").unwrap();
        assert!(matches!(
            watcher.reload(),
            ReloadOutcome::Rejected(ConfigError::Validation(_))
        ));
        assert!(rx.try_recv().is_err());

        fs::write(&path, UPDATED).unwrap();
        assert!(matches!(watcher.reload(), ReloadOutcome::Applied));
        assert!(rx.try_recv().unwrap().storage.session_id.is_none());

        fs::remove_file(&path).unwrap();
        assert!(matches!(watcher.reload(), ReloadOutcome::Rejected(ConfigError::Io(_))));

        fs::remove_dir_all(path.parent().unwrap()).unwrap_or_default();
    }

    #[tokio::test]
    async fn test_file_change_reaches_channel() {
        let path = temp_config(INITIAL);
        let (watcher, mut rx) = ConfigWatcher::new(&path);
        let _handle = watcher.with_session("live").run().unwrap();

        fs::write(&path, UPDATED).unwrap();

        let config = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("no reload within 10s")
            .unwrap();
        assert_eq!(config.poller.endpoint, "http://127.0.0.1:9000/health");
        assert_eq!(config.storage.session_id.as_deref(), Some("live"));

        fs::remove_dir_all(path.parent().unwrap()).unwrap_or_default();
    }
}
