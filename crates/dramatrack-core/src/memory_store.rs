//! In-process [`SnapshotStore`] backed by a mutex-guarded map.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::records::{validate_snapshot, HistoryPoint, ItemRecord, Snapshot, SnapshotPair};
use crate::store::{SnapshotStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    next_sequence: i64,
    /// Per platform, ordered by `(captured_at, sequence)`.
    snapshots: HashMap<String, Vec<Snapshot>>,
}

/// Snapshot history held in memory for the lifetime of the value.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    inner: Mutex<Inner>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Read("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn append(
        &self,
        platform: &str,
        captured_at: DateTime<Utc>,
        mut records: Vec<ItemRecord>,
    ) -> Result<Snapshot, StoreError> {
        validate_snapshot(platform, &records)?;
        records.sort_by_key(|r| r.rank);
        for r in &mut records {
            r.captured_at = captured_at;
        }

        let mut inner = self.inner.lock().map_err(|_| StoreError::Write {
            platform: platform.to_string(),
            reason: "memory store lock poisoned".to_string(),
        })?;
        inner.next_sequence += 1;
        let snapshot = Snapshot {
            platform: platform.to_string(),
            captured_at,
            sequence: inner.next_sequence,
            items: records,
        };

        let history = inner.snapshots.entry(platform.to_string()).or_default();
        let at = history.partition_point(|s| s.captured_at <= captured_at);
        history.insert(at, snapshot.clone());
        Ok(snapshot)
    }

    async fn latest_two(&self, platform: &str) -> Result<SnapshotPair, StoreError> {
        let inner = self.lock()?;
        let Some(history) = inner.snapshots.get(platform) else {
            return Ok(SnapshotPair::default());
        };
        let mut newest = history.iter().rev();
        let current = newest.next().cloned();
        let previous = newest.next().cloned();
        Ok(SnapshotPair { previous, current })
    }

    async fn snapshots_since(
        &self,
        platform: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Snapshot>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .snapshots
            .get(platform)
            .map(|history| {
                history
                    .iter()
                    .filter(|s| s.captured_at >= cutoff)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn item_history(
        &self,
        platform: &str,
        item_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<HistoryPoint>, StoreError> {
        let inner = self.lock()?;
        let Some(history) = inner.snapshots.get(platform) else {
            return Ok(Vec::new());
        };
        Ok(history
            .iter()
            .filter(|s| s.captured_at >= cutoff)
            .filter_map(|s| s.items.iter().find(|i| i.item_id == item_id))
            .map(|i| HistoryPoint {
                captured_at: i.captured_at,
                rank: i.rank,
                read_count: i.read_count,
                collect_count: i.collect_count,
            })
            .collect())
    }

    async fn platforms(&self) -> Result<Vec<String>, StoreError> {
        let inner = self.lock()?;
        let mut ids: Vec<String> = inner
            .snapshots
            .iter()
            .filter(|(_, history)| !history.is_empty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
