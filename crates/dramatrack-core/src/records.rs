use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One tracked item as observed in one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Platform identifier, e.g. `"reelshort"`.
    pub platform: String,
    /// Stable identifier assigned by the platform. Must not change when the
    /// same underlying content reappears in a later capture.
    pub item_id: String,
    pub title: String,
    /// 1-based position in the ranking; 1 is the most popular.
    pub rank: u32,
    pub read_count: u64,
    pub collect_count: u64,
    #[serde(default)]
    pub genres: BTreeSet<String>,
    pub captured_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
    /// Platform-provided rating. Carried as-is; nothing in the analysis reads it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

/// An item as produced by a platform source, before it is stamped with the
/// platform and capture time of the snapshot it lands in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedItem {
    pub item_id: String,
    pub title: String,
    pub rank: u32,
    #[serde(default)]
    pub read_count: u64,
    #[serde(default)]
    pub collect_count: u64,
    #[serde(default)]
    pub genres: BTreeSet<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub episode_count: Option<u32>,
    #[serde(default)]
    pub like_count: Option<u64>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub cover_url: Option<String>,
}

impl ScrapedItem {
    /// Stamp this item with its platform and capture time.
    #[must_use]
    pub fn into_record(self, platform: &str, captured_at: DateTime<Utc>) -> ItemRecord {
        ItemRecord {
            platform: platform.to_string(),
            item_id: self.item_id,
            title: self.title,
            rank: self.rank,
            read_count: self.read_count,
            collect_count: self.collect_count,
            genres: self.genres,
            captured_at,
            description: self.description,
            episode_count: self.episode_count,
            like_count: self.like_count,
            score: self.score,
            cover_url: self.cover_url,
        }
    }
}

/// Every [`ItemRecord`] captured for one `(platform, captured_at)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub platform: String,
    pub captured_at: DateTime<Utc>,
    /// Store-assigned insertion order. Breaks ties between snapshots that
    /// share a `captured_at`.
    pub sequence: i64,
    /// Sorted by `rank` ascending.
    pub items: Vec<ItemRecord>,
}

impl Snapshot {
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items tagged with `genre`.
    #[must_use]
    pub fn genre_count(&self, genre: &str) -> usize {
        self.items.iter().filter(|i| i.genres.contains(genre)).count()
    }
}

/// The two most recent snapshots for a platform, oldest first.
///
/// `previous` is `None` when fewer than two snapshots exist, which callers
/// report as insufficient history rather than an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotPair {
    pub previous: Option<Snapshot>,
    pub current: Option<Snapshot>,
}

impl SnapshotPair {
    #[must_use]
    pub fn has_sufficient_history(&self) -> bool {
        self.previous.is_some() && self.current.is_some()
    }
}

/// One item's metrics at one capture, used for per-item history queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub captured_at: DateTime<Utc>,
    pub rank: u32,
    pub read_count: u64,
    pub collect_count: u64,
}

/// A capture batch that breaks the per-snapshot uniqueness rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSnapshotError {
    #[error("duplicate item_id '{item_id}' in {platform} snapshot")]
    DuplicateItemId { platform: String, item_id: String },

    #[error("duplicate rank {rank} in {platform} snapshot")]
    DuplicateRank { platform: String, rank: u32 },

    #[error("item '{item_id}' has rank 0; ranks start at 1")]
    ZeroRank { item_id: String },

    #[error("empty item_id at rank {rank}")]
    EmptyItemId { rank: u32 },

    #[error("record '{item_id}' belongs to platform '{found}', expected '{expected}'")]
    PlatformMismatch {
        expected: String,
        found: String,
        item_id: String,
    },
}

/// Check a capture batch against the snapshot invariants: unique non-empty
/// `item_id`, unique positive `rank`, and a single platform.
///
/// # Errors
///
/// Returns the first [`InvalidSnapshotError`] encountered, in input order.
pub fn validate_snapshot(platform: &str, records: &[ItemRecord]) -> Result<(), InvalidSnapshotError> {
    let mut seen_ids = HashSet::with_capacity(records.len());
    let mut seen_ranks = HashSet::with_capacity(records.len());

    for record in records {
        if record.platform != platform {
            return Err(InvalidSnapshotError::PlatformMismatch {
                expected: platform.to_string(),
                found: record.platform.clone(),
                item_id: record.item_id.clone(),
            });
        }
        if record.item_id.trim().is_empty() {
            return Err(InvalidSnapshotError::EmptyItemId { rank: record.rank });
        }
        if record.rank == 0 {
            return Err(InvalidSnapshotError::ZeroRank {
                item_id: record.item_id.clone(),
            });
        }
        if !seen_ids.insert(record.item_id.as_str()) {
            return Err(InvalidSnapshotError::DuplicateItemId {
                platform: platform.to_string(),
                item_id: record.item_id.clone(),
            });
        }
        if !seen_ranks.insert(record.rank) {
            return Err(InvalidSnapshotError::DuplicateRank {
                platform: platform.to_string(),
                rank: record.rank,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "records_test.rs"]
mod tests;
