//! Per-platform analysis over a snapshot store.

use dramatrack_core::{SnapshotStore, StoreError};
use futures::stream::{self, StreamExt};

use crate::analyzer::ChangeAnalyzer;
use crate::trends::TrendAggregator;
use crate::types::PlatformAnalysis;

/// Analyze the latest capture of `platform` against the one before it and
/// aggregate genre trends over the aggregator's window.
///
/// With fewer than two stored snapshots the result carries
/// `has_sufficient_history = false` and no categorized lists.
///
/// # Errors
///
/// Returns [`StoreError::Read`] if the store cannot be queried.
pub async fn analyze_platform(
    store: &dyn SnapshotStore,
    analyzer: &ChangeAnalyzer,
    aggregator: &TrendAggregator,
    platform: &str,
) -> Result<PlatformAnalysis, StoreError> {
    let pair = store.latest_two(platform).await?;
    let window = store.window(platform, aggregator.window()).await?;
    let trend = aggregator.aggregate(platform, &window);

    let (previous, current) = match (pair.previous, pair.current) {
        (Some(previous), Some(current)) => (previous, current),
        (_, current) => {
            tracing::info!(platform, "insufficient history, skipping change analysis");
            return Ok(PlatformAnalysis {
                platform: platform.to_string(),
                has_sufficient_history: false,
                current,
                previous_captured_at: None,
                analysis: None,
                trend,
            });
        }
    };

    let analysis = analyzer.analyze(&previous, &current);
    tracing::debug!(
        platform,
        rank_surges = analysis.totals.rank_surges,
        rank_drops = analysis.totals.rank_drops,
        new_entries = analysis.totals.new_entries,
        dropped_entries = analysis.totals.dropped_entries,
        "platform analyzed"
    );

    Ok(PlatformAnalysis {
        platform: platform.to_string(),
        has_sufficient_history: true,
        previous_captured_at: Some(previous.captured_at),
        current: Some(current),
        analysis: Some(analysis),
        trend,
    })
}

/// Run [`analyze_platform`] for each platform, at most `concurrency` at a
/// time. A failure is logged and returned for its platform only.
///
/// Results come back in the order of `platforms`.
pub async fn analyze_platforms(
    store: &dyn SnapshotStore,
    analyzer: &ChangeAnalyzer,
    aggregator: &TrendAggregator,
    platforms: &[String],
    concurrency: usize,
) -> Vec<(String, Result<PlatformAnalysis, StoreError>)> {
    let mut results: Vec<(usize, String, Result<PlatformAnalysis, StoreError>)> =
        stream::iter(platforms.iter().enumerate())
            .map(|(index, platform)| async move {
                let result = analyze_platform(store, analyzer, aggregator, platform).await;
                if let Err(ref e) = result {
                    tracing::error!(platform = %platform, error = %e, "platform analysis failed");
                }
                (index, platform.clone(), result)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

    results.sort_by_key(|(index, _, _)| *index);
    results
        .into_iter()
        .map(|(_, platform, result)| (platform, result))
        .collect()
}
