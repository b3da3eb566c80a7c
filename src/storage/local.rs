//! Local filesystem history store.
//!
//! Writes go to a temporary sibling file first and are renamed over the
//! target, so a failed save never leaves a truncated history behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::History;
use crate::storage::{HistoryStore, RemoteSync, SyncOutcome};

/// History stored as a JSON array in one file.
pub struct LocalHistoryStore {
    path: PathBuf,
    remote: Option<Box<dyn RemoteSync>>,
}

impl LocalHistoryStore {
    /// Create a store for the given file, without remote backup.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            remote: None,
        }
    }

    /// Create a store that replicates to `remote` after each save.
    pub fn with_remote(path: impl Into<PathBuf>, remote: Box<dyn RemoteSync>) -> Self {
        Self {
            path: path.into(),
            remote: Some(remote),
        }
    }

    /// Path of the history file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sidecar file holding the digest of the last synced bytes.
    fn marker_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".synced");
        PathBuf::from(name)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let written = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, path).await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Read bytes, returning None if the file doesn't exist.
    async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn digest(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }
}

#[async_trait]
impl HistoryStore for LocalHistoryStore {
    async fn load(&self) -> History {
        let bytes = match Self::read_bytes(&self.path).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log::info!(
                    "No history at {}, starting with an empty one",
                    self.path.display()
                );
                return History::new();
            }
            Err(e) => {
                log::warn!(
                    "Failed to read history from {}: {}. Starting with an empty one.",
                    self.path.display(),
                    e
                );
                return History::new();
            }
        };

        match serde_json::from_slice::<History>(&bytes) {
            Ok(history) => {
                log::info!(
                    "Loaded {} sent links from {}",
                    history.len(),
                    self.path.display()
                );
                history
            }
            Err(e) => {
                log::warn!(
                    "History at {} is corrupt: {}. Starting with an empty one.",
                    self.path.display(),
                    e
                );
                History::new()
            }
        }
    }

    async fn save(&self, history: &History) -> Result<()> {
        let bytes = history.to_json_bytes()?;
        Self::write_bytes(&self.path, &bytes)
            .await
            .map_err(|e| AppError::persistence(format!("{}: {}", self.path.display(), e)))?;
        log::info!(
            "Saved {} sent links to {}",
            history.len(),
            self.path.display()
        );
        Ok(())
    }

    async fn sync_remote(&self, history: &History) -> SyncOutcome {
        let Some(remote) = &self.remote else {
            return SyncOutcome::Disabled;
        };

        let bytes = match history.to_json_bytes() {
            Ok(bytes) => bytes,
            Err(e) => return SyncOutcome::Failed(e.to_string()),
        };
        let digest = Self::digest(&bytes);
        let marker = self.marker_path();

        if let Ok(Some(previous)) = Self::read_bytes(&marker).await {
            if previous.trim_ascii() == digest.as_bytes() {
                log::info!("History unchanged since last sync to {}", remote.target());
                return SyncOutcome::Unchanged;
            }
        }

        if let Err(e) = remote.sync_remote(&bytes).await {
            log::warn!("Remote sync to {} failed: {}", remote.target(), e);
            return SyncOutcome::Failed(e.to_string());
        }

        if let Err(e) = Self::write_bytes(&marker, digest.as_bytes()).await {
            log::warn!("Failed to record sync marker {}: {}", marker.display(), e);
        }
        log::info!("History synced to {}", remote.target());
        SyncOutcome::Synced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Remote that counts pushes and optionally fails.
    struct CountingRemote {
        pushes: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl RemoteSync for CountingRemote {
        async fn sync_remote(&self, _bytes: &[u8]) -> Result<()> {
            self.pushes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AppError::sync(self.target(), "remote rejected push"))
            } else {
                Ok(())
            }
        }

        fn target(&self) -> String {
            "counting".to_string()
        }
    }

    fn store_with_remote(dir: &TempDir, fail: bool) -> (LocalHistoryStore, Arc<AtomicUsize>) {
        let pushes = Arc::new(AtomicUsize::new(0));
        let remote = CountingRemote {
            pushes: Arc::clone(&pushes),
            fail,
        };
        let store = LocalHistoryStore::with_remote(dir.path().join("sent.json"), Box::new(remote));
        (store, pushes)
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(tmp.path().join("sent.json"));

        let history: History = ["http://a.com", "http://b.com", "http://c.com"]
            .into_iter()
            .collect();
        store.save(&history).await.unwrap();

        assert_eq!(store.load().await, history);
        assert!(!tmp.path().join("sent.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(tmp.path().join("nope.json"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sent.json");
        std::fs::write(&path, b"{\"not\": \"an array\"").unwrap();

        let store = LocalHistoryStore::new(&path);
        assert!(store.load().await.is_empty());

        std::fs::write(&path, b"[1, 2, 3]").unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(tmp.path().join("state/nested/sent.json"));

        let history: History = ["http://a.com"].into_iter().collect();
        store.save(&history).await.unwrap();
        assert_eq!(store.load().await.len(), 1);
    }

    #[tokio::test]
    async fn test_save_failure_is_persistence_error() {
        let tmp = TempDir::new().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = tmp.path().join("sent.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        let store = LocalHistoryStore::new(&path);
        let err = store.save(&History::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_failed_save_removes_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sent.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        let store = LocalHistoryStore::new(&path);
        let history: History = ["http://a.com"].into_iter().collect();
        assert!(store.save(&history).await.is_err());
        assert!(!tmp.path().join("sent.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_sync_disabled_without_remote() {
        let tmp = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(tmp.path().join("sent.json"));
        assert_eq!(store.sync_remote(&History::new()).await, SyncOutcome::Disabled);
    }

    #[tokio::test]
    async fn test_sync_skips_unchanged_history() {
        let tmp = TempDir::new().unwrap();
        let (store, pushes) = store_with_remote(&tmp, false);

        let mut history: History = ["http://a.com"].into_iter().collect();
        assert_eq!(store.sync_remote(&history).await, SyncOutcome::Synced);
        assert_eq!(store.sync_remote(&history).await, SyncOutcome::Unchanged);
        assert_eq!(pushes.load(Ordering::SeqCst), 1);

        history.insert("http://b.com");
        assert_eq!(store.sync_remote(&history).await, SyncOutcome::Synced);
        assert_eq!(pushes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_sync_is_retried_next_time() {
        let tmp = TempDir::new().unwrap();
        let (store, pushes) = store_with_remote(&tmp, true);

        let history: History = ["http://a.com"].into_iter().collect();
        assert!(matches!(
            store.sync_remote(&history).await,
            SyncOutcome::Failed(_)
        ));
        assert!(matches!(
            store.sync_remote(&history).await,
            SyncOutcome::Failed(_)
        ));
        assert_eq!(pushes.load(Ordering::SeqCst), 2);
        assert!(!tmp.path().join("sent.json.synced").exists());
    }
}
