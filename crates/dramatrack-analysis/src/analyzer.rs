//! Snapshot-to-snapshot change detection.
//!
//! Items are joined by `item_id`. Threshold comparisons are inclusive, and
//! every list is fully ordered (magnitude, then `item_id`) before it is
//! truncated, so identical inputs always yield identical output.

use std::collections::HashMap;

use dramatrack_core::{AnalyzerConfig, ItemRecord, Snapshot};

use crate::types::{
    AnalysisResult, CategoryTotals, DroppedEntry, Growth, MetricSurge, NewEntry, RankChange,
};

/// Pure, stateless comparison of two snapshots under a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct ChangeAnalyzer {
    config: AnalyzerConfig,
}

impl ChangeAnalyzer {
    /// Rank thresholds below 1 are raised to 1 so an unchanged rank is never
    /// both a surge and a drop.
    #[must_use]
    pub fn new(mut config: AnalyzerConfig) -> Self {
        config.rank_surge_threshold = config.rank_surge_threshold.max(1);
        config.rank_drop_threshold = config.rank_drop_threshold.map(|t| t.max(1));
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Compare `previous` against `current` for the same platform.
    #[must_use]
    pub fn analyze(&self, previous: &Snapshot, current: &Snapshot) -> AnalysisResult {
        let surge_threshold = i64::from(self.config.rank_surge_threshold);
        let drop_threshold = i64::from(self.config.effective_rank_drop_threshold());

        let previous_by_id: HashMap<&str, &ItemRecord> = previous
            .items
            .iter()
            .map(|i| (i.item_id.as_str(), i))
            .collect();
        let current_by_id: HashMap<&str, &ItemRecord> = current
            .items
            .iter()
            .map(|i| (i.item_id.as_str(), i))
            .collect();

        let mut rank_surges = Vec::new();
        let mut rank_drops = Vec::new();
        let mut new_entries = Vec::new();
        let mut read_count_surges = Vec::new();
        let mut collect_surges = Vec::new();

        for item in &current.items {
            let Some(before) = previous_by_id.get(item.item_id.as_str()) else {
                new_entries.push(NewEntry {
                    item_id: item.item_id.clone(),
                    title: item.title.clone(),
                    genres: item.genres.clone(),
                    current_rank: item.rank,
                    read_count: item.read_count,
                    collect_count: item.collect_count,
                });
                continue;
            };

            let rank_delta = i64::from(before.rank) - i64::from(item.rank);
            if rank_delta >= surge_threshold {
                rank_surges.push(rank_change(before, item, rank_delta));
            }
            if -rank_delta >= drop_threshold {
                rank_drops.push(rank_change(before, item, rank_delta));
            }

            if let Some(growth) = growth_over(
                before.read_count,
                item.read_count,
                self.config.read_count_surge_pct,
            ) {
                read_count_surges.push(metric_surge(item, before.read_count, item.read_count, growth));
            }
            if let Some(growth) = growth_over(
                before.collect_count,
                item.collect_count,
                self.config.collect_surge_pct,
            ) {
                collect_surges.push(metric_surge(
                    item,
                    before.collect_count,
                    item.collect_count,
                    growth,
                ));
            }
        }

        let mut dropped_entries: Vec<DroppedEntry> = previous
            .items
            .iter()
            .filter(|i| !current_by_id.contains_key(i.item_id.as_str()))
            .map(|i| DroppedEntry {
                item_id: i.item_id.clone(),
                title: i.title.clone(),
                genres: i.genres.clone(),
                previous_rank: i.rank,
                read_count: i.read_count,
                collect_count: i.collect_count,
            })
            .collect();

        rank_surges.sort_by(|a: &RankChange, b: &RankChange| {
            b.rank_delta
                .cmp(&a.rank_delta)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        rank_drops.sort_by(|a: &RankChange, b: &RankChange| {
            a.rank_delta
                .cmp(&b.rank_delta)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        new_entries.sort_by(|a, b| {
            a.current_rank
                .cmp(&b.current_rank)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        dropped_entries.sort_by(|a, b| {
            a.previous_rank
                .cmp(&b.previous_rank)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        sort_metric_surges(&mut read_count_surges);
        sort_metric_surges(&mut collect_surges);

        let totals = CategoryTotals {
            rank_surges: rank_surges.len(),
            rank_drops: rank_drops.len(),
            new_entries: new_entries.len(),
            dropped_entries: dropped_entries.len(),
            read_count_surges: read_count_surges.len(),
            collect_surges: collect_surges.len(),
        };

        let cap = self.config.report_max_items;
        rank_surges.truncate(cap);
        rank_drops.truncate(cap);
        new_entries.truncate(cap);
        dropped_entries.truncate(cap);
        read_count_surges.truncate(cap);
        collect_surges.truncate(cap);

        AnalysisResult {
            platform: current.platform.clone(),
            previous_captured_at: previous.captured_at,
            current_captured_at: current.captured_at,
            rank_surges,
            rank_drops,
            new_entries,
            dropped_entries,
            read_count_surges,
            collect_surges,
            totals,
        }
    }
}

fn rank_change(before: &ItemRecord, after: &ItemRecord, rank_delta: i64) -> RankChange {
    RankChange {
        item_id: after.item_id.clone(),
        title: after.title.clone(),
        genres: after.genres.clone(),
        previous_rank: before.rank,
        current_rank: after.rank,
        rank_delta,
    }
}

fn metric_surge(item: &ItemRecord, previous: u64, current: u64, growth: Growth) -> MetricSurge {
    MetricSurge {
        item_id: item.item_id.clone(),
        title: item.title.clone(),
        genres: item.genres.clone(),
        current_rank: item.rank,
        previous_value: previous,
        current_value: current,
        growth,
    }
}

/// Growth from `previous` to `current` if it meets `threshold_pct`.
///
/// A zero baseline has no percentage; any positive current value counts as
/// [`Growth::New`].
#[allow(clippy::cast_precision_loss)]
fn growth_over(previous: u64, current: u64, threshold_pct: f64) -> Option<Growth> {
    if previous == 0 {
        return (current > 0).then_some(Growth::New);
    }
    let pct = (current as f64 - previous as f64) / previous as f64 * 100.0;
    (pct >= threshold_pct).then_some(Growth::Percent(pct))
}

fn sort_metric_surges(surges: &mut [MetricSurge]) {
    surges.sort_by(|a, b| {
        b.growth
            .cmp_magnitude(&a.growth)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
}

#[cfg(test)]
#[path = "analyzer_test.rs"]
mod tests;
