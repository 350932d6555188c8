//! Snapshot store interface.
//!
//! Implementors: [`crate::MemorySnapshotStore`] (in-process) and the Postgres
//! store in `dramatrack-db`. The history is append-only: no method mutates or
//! removes a snapshot once [`SnapshotStore::append`] has returned.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::records::{HistoryPoint, InvalidSnapshotError, ItemRecord, Snapshot, SnapshotPair};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(#[from] InvalidSnapshotError),

    #[error("snapshot write failed for {platform}: {reason}")]
    Write { platform: String, reason: String },

    #[error("snapshot read failed: {0}")]
    Read(String),
}

/// Start of the trailing `since` window ending at `now`, saturating at the
/// earliest representable instant.
#[must_use]
pub fn window_cutoff(now: DateTime<Utc>, since: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(since)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist one complete snapshot.
    ///
    /// The batch is validated before anything is written and is committed as
    /// a whole: after an error no part of it is visible to readers.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidSnapshot`] if the batch breaks a uniqueness rule,
    /// [`StoreError::Write`] if the medium rejects the write.
    async fn append(
        &self,
        platform: &str,
        captured_at: DateTime<Utc>,
        records: Vec<ItemRecord>,
    ) -> Result<Snapshot, StoreError>;

    /// The two most recent snapshots, oldest first.
    ///
    /// # Errors
    ///
    /// [`StoreError::Read`] if the medium cannot be queried.
    async fn latest_two(&self, platform: &str) -> Result<SnapshotPair, StoreError>;

    /// All snapshots with `captured_at >= cutoff`, oldest first.
    ///
    /// # Errors
    ///
    /// [`StoreError::Read`] if the medium cannot be queried.
    async fn snapshots_since(
        &self,
        platform: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Snapshot>, StoreError>;

    /// Metrics for one item across every snapshot with `captured_at >= cutoff`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Read`] if the medium cannot be queried.
    async fn item_history(
        &self,
        platform: &str,
        item_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, StoreError>;

    /// Distinct platform ids that have at least one snapshot, sorted.
    ///
    /// # Errors
    ///
    /// [`StoreError::Read`] if the medium cannot be queried.
    async fn platforms(&self) -> Result<Vec<String>, StoreError>;

    /// Snapshots captured within the trailing `since` window, oldest first.
    ///
    /// # Errors
    ///
    /// [`StoreError::Read`] if the medium cannot be queried.
    async fn window(&self, platform: &str, since: Duration) -> Result<Vec<Snapshot>, StoreError> {
        self.snapshots_since(platform, window_cutoff(Utc::now(), since))
            .await
    }

    /// The most recent snapshot, if any.
    ///
    /// # Errors
    ///
    /// [`StoreError::Read`] if the medium cannot be queried.
    async fn latest(&self, platform: &str) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.latest_two(platform).await?.current)
    }
}
