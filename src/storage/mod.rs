//! Storage abstractions for the sent-link history.
//!
//! The history lives in a single local JSON file and may be mirrored to a
//! remote backup after each run.
//!
//! ## Layout
//!
//! ```text
//! {history}               # JSON array of sent links
//! {history}.synced        # SHA-256 of the bytes last replicated remotely
//! ```

pub mod git;
pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::History;

// Re-export for convenience
pub use git::GitRemote;
pub use local::LocalHistoryStore;
#[cfg(feature = "s3")]
pub use s3::S3Backup;

/// Result of a best-effort remote sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No remote backup configured
    Disabled,
    /// Replicated bytes are identical to the last successful sync
    Unchanged,
    /// History pushed to the remote
    Synced,
    /// Replication failed; the run continues
    Failed(String),
}

/// Trait for history storage backends.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Load the persisted history.
    ///
    /// Never fails: a missing or unreadable store yields an empty history.
    async fn load(&self) -> History;

    /// Replace the persisted history with `history`, all-or-nothing.
    async fn save(&self, history: &History) -> Result<()>;

    /// Replicate the persisted history to the remote backup, if any.
    async fn sync_remote(&self, history: &History) -> SyncOutcome;
}

/// A remote destination for history backups.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    /// Push the serialized history.
    async fn sync_remote(&self, bytes: &[u8]) -> Result<()>;

    /// Human-readable target, used in logs.
    fn target(&self) -> String;
}
