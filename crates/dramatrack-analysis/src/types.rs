use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use dramatrack_core::Snapshot;
use serde::{Deserialize, Serialize};

/// An item whose rank moved by at least the configured threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankChange {
    pub item_id: String,
    pub title: String,
    pub genres: BTreeSet<String>,
    pub previous_rank: u32,
    pub current_rank: u32,
    /// `previous_rank - current_rank`; positive means the item climbed.
    pub rank_delta: i64,
}

/// An item present in the current snapshot but not the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub item_id: String,
    pub title: String,
    pub genres: BTreeSet<String>,
    pub current_rank: u32,
    pub read_count: u64,
    pub collect_count: u64,
}

/// An item present in the previous snapshot but not the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedEntry {
    pub item_id: String,
    pub title: String,
    pub genres: BTreeSet<String>,
    pub previous_rank: u32,
    pub read_count: u64,
    pub collect_count: u64,
}

/// Relative growth of a cumulative metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Growth {
    /// `(current - previous) / previous * 100`.
    Percent(f64),
    /// The previous value was zero, so no percentage exists.
    New,
}

impl Growth {
    /// Total order used for sorting: `New` ranks above every percentage.
    #[must_use]
    pub fn cmp_magnitude(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Growth::New, Growth::New) => Ordering::Equal,
            (Growth::New, Growth::Percent(_)) => Ordering::Greater,
            (Growth::Percent(_), Growth::New) => Ordering::Less,
            (Growth::Percent(a), Growth::Percent(b)) => a.total_cmp(b),
        }
    }

    #[must_use]
    pub fn percent(&self) -> Option<f64> {
        match self {
            Growth::Percent(p) => Some(*p),
            Growth::New => None,
        }
    }
}

impl std::fmt::Display for Growth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Growth::Percent(p) => write!(f, "+{p:.1}%"),
            Growth::New => write!(f, "new"),
        }
    }
}

/// A read-count or collect-count increase at or above its threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSurge {
    pub item_id: String,
    pub title: String,
    pub genres: BTreeSet<String>,
    pub current_rank: u32,
    pub previous_value: u64,
    pub current_value: u64,
    pub growth: Growth,
}

/// Size of each category before truncation to `report_max_items`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub rank_surges: usize,
    pub rank_drops: usize,
    pub new_entries: usize,
    pub dropped_entries: usize,
    pub read_count_surges: usize,
    pub collect_surges: usize,
}

/// Categorized diff between two snapshots of one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub platform: String,
    pub previous_captured_at: DateTime<Utc>,
    pub current_captured_at: DateTime<Utc>,
    pub rank_surges: Vec<RankChange>,
    pub rank_drops: Vec<RankChange>,
    pub new_entries: Vec<NewEntry>,
    pub dropped_entries: Vec<DroppedEntry>,
    pub read_count_surges: Vec<MetricSurge>,
    pub collect_surges: Vec<MetricSurge>,
    pub totals: CategoryTotals,
}

impl AnalysisResult {
    /// No rank movement past the thresholds and nothing new on the board.
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.totals.rank_surges == 0 && self.totals.rank_drops == 0 && self.totals.new_entries == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Falling,
}

/// Change in how many items carry one genre across the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreTrend {
    pub genre: String,
    pub count_start: usize,
    pub count_end: usize,
    /// `count_end - count_start`; never zero.
    pub delta: i64,
}

impl GenreTrend {
    #[must_use]
    pub fn direction(&self) -> TrendDirection {
        if self.delta > 0 {
            TrendDirection::Rising
        } else {
            TrendDirection::Falling
        }
    }
}

/// Genre-level shifts between the first and last snapshot of a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendResult {
    pub platform: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Ordered by `|delta|` descending, then genre ascending.
    pub genres: Vec<GenreTrend>,
}

impl TrendResult {
    pub fn rising(&self) -> impl Iterator<Item = &GenreTrend> {
        self.genres
            .iter()
            .filter(|g| g.direction() == TrendDirection::Rising)
    }

    pub fn falling(&self) -> impl Iterator<Item = &GenreTrend> {
        self.genres
            .iter()
            .filter(|g| g.direction() == TrendDirection::Falling)
    }
}

/// Everything derived for one platform in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformAnalysis {
    pub platform: String,
    /// False when fewer than two snapshots exist; `analysis` is then `None`.
    pub has_sufficient_history: bool,
    pub current: Option<Snapshot>,
    pub previous_captured_at: Option<DateTime<Utc>>,
    pub analysis: Option<AnalysisResult>,
    pub trend: Option<TrendResult>,
}
