use serde::{Deserialize, Serialize};

pub const DEFAULT_RANK_SURGE_THRESHOLD: u32 = 10;
pub const DEFAULT_READ_COUNT_SURGE_PCT: f64 = 50.0;
pub const DEFAULT_COLLECT_SURGE_PCT: f64 = 30.0;
pub const DEFAULT_REPORT_MAX_ITEMS: usize = 10;

/// Thresholds consumed by the change analyzer.
///
/// All comparisons against these values are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Minimum rank improvement (`previous_rank - current_rank`) for a surge.
    pub rank_surge_threshold: u32,
    /// Minimum rank worsening for a drop. Falls back to
    /// `rank_surge_threshold` when unset.
    pub rank_drop_threshold: Option<u32>,
    /// Minimum percentage increase in `read_count`.
    pub read_count_surge_pct: f64,
    /// Minimum percentage increase in `collect_count`.
    pub collect_surge_pct: f64,
    /// Per-category cap applied after sorting.
    pub report_max_items: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            rank_surge_threshold: DEFAULT_RANK_SURGE_THRESHOLD,
            rank_drop_threshold: None,
            read_count_surge_pct: DEFAULT_READ_COUNT_SURGE_PCT,
            collect_surge_pct: DEFAULT_COLLECT_SURGE_PCT,
            report_max_items: DEFAULT_REPORT_MAX_ITEMS,
        }
    }
}

impl AnalyzerConfig {
    /// Effective drop threshold after applying the surge-threshold fallback.
    #[must_use]
    pub fn effective_rank_drop_threshold(&self) -> u32 {
        self.rank_drop_threshold.unwrap_or(self.rank_surge_threshold)
    }
}
