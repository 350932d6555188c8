//! `analyze`, `report`, `export`, and `history`: read-side commands over the
//! snapshot store.

use std::path::Path;

use chrono::{Duration, Utc};
use dramatrack_analysis::{
    analyze_platforms, render_report, write_export, ChangeAnalyzer, ExportDocument,
    PlatformAnalysis, TrendAggregator,
};
use dramatrack_core::{
    window_cutoff, AppConfig, PlatformsFile, Snapshot, SnapshotStore, MAX_WINDOW_DAYS,
};

/// Analyze each platform in `requested`, or every stored platform when the
/// list is empty. Platforms whose analysis fails are skipped with an error
/// log; failing all of them is an error.
pub(crate) async fn gather(
    store: &dyn SnapshotStore,
    config: &AppConfig,
    requested: &[String],
) -> anyhow::Result<Vec<PlatformAnalysis>> {
    let platforms = if requested.is_empty() {
        store.platforms().await?
    } else {
        requested.to_vec()
    };
    if platforms.is_empty() {
        return Ok(Vec::new());
    }

    let analyzer = ChangeAnalyzer::new(config.analyzer.clone());
    let aggregator = TrendAggregator::new(config.trend_window());

    let results = analyze_platforms(
        store,
        &analyzer,
        &aggregator,
        &platforms,
        config.max_concurrent_platforms,
    )
    .await;

    let total = results.len();
    let analyses: Vec<PlatformAnalysis> = results
        .into_iter()
        .filter_map(|(_, result)| result.ok())
        .collect();

    if analyses.is_empty() {
        anyhow::bail!("analysis failed for all {total} platforms");
    }
    Ok(analyses)
}

pub(crate) fn summary_line(analysis: &PlatformAnalysis) -> String {
    let items = analysis.current.as_ref().map_or(0, Snapshot::len);
    match &analysis.analysis {
        Some(result) => {
            let t = &result.totals;
            format!(
                "{:<14}{:>6}  surges {} | drops {} | new {} | dropped {} | read {} | collect {}",
                analysis.platform,
                items,
                t.rank_surges,
                t.rank_drops,
                t.new_entries,
                t.dropped_entries,
                t.read_count_surges,
                t.collect_surges
            )
        }
        None if items == 0 => format!("{:<14}{:>6}  no snapshots", analysis.platform, items),
        None => format!(
            "{:<14}{:>6}  first capture; run `dramatrack collect` again to compare",
            analysis.platform, items
        ),
    }
}

pub(crate) async fn run_analyze(
    store: &dyn SnapshotStore,
    config: &AppConfig,
    platforms: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let analyses = gather(store, config, platforms).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analyses)?);
        return Ok(());
    }

    if analyses.is_empty() {
        println!("no snapshots found; run `dramatrack collect` first");
        return Ok(());
    }

    println!("{:<14}{:>6}  CHANGES", "PLATFORM", "ITEMS");
    for analysis in &analyses {
        println!("{}", summary_line(analysis));
    }
    Ok(())
}

/// Write `report` to `path`, creating parent directories as needed.
fn save_report(report: &str, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", parent.display()))?;
    }
    std::fs::write(path, report)
        .map_err(|e| anyhow::anyhow!("failed to write report {}: {e}", path.display()))?;
    tracing::info!(path = %path.display(), chars = report.chars().count(), "report saved");
    Ok(())
}

/// Save the full report to `path` and print it cut to `max_chars`.
fn publish_report(
    analyses: &[PlatformAnalysis],
    catalog: &PlatformsFile,
    path: &Path,
    max_chars: usize,
) -> anyhow::Result<()> {
    save_report(&render_report(analyses, catalog, None), path)?;
    println!("{}", render_report(analyses, catalog, Some(max_chars)));
    Ok(())
}

/// Build the export document and write it to `path`.
fn publish_export(
    analyses: &[PlatformAnalysis],
    config: &AppConfig,
    catalog: &PlatformsFile,
    path: &Path,
) -> anyhow::Result<()> {
    let document = ExportDocument::build(
        analyses,
        catalog,
        config.top_n,
        config.trend_window(),
        Utc::now(),
    );

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", parent.display()))?;
    }
    write_export(&document, path)?;
    println!(
        "exported {} platform(s) to {}",
        document.platforms.len(),
        path.display()
    );
    Ok(())
}

pub(crate) async fn run_report(
    store: &dyn SnapshotStore,
    config: &AppConfig,
    catalog: &PlatformsFile,
    platforms: &[String],
    path: &Path,
    max_chars: usize,
) -> anyhow::Result<()> {
    let analyses = gather(store, config, platforms).await?;
    publish_report(&analyses, catalog, path, max_chars)
}

pub(crate) async fn run_export(
    store: &dyn SnapshotStore,
    config: &AppConfig,
    catalog: &PlatformsFile,
    platforms: &[String],
    path: &Path,
) -> anyhow::Result<()> {
    let analyses = gather(store, config, platforms).await?;
    publish_export(&analyses, config, catalog, path)
}

/// Analyze once, then write the report and the export to their configured
/// paths.
pub(crate) async fn run_report_and_export(
    store: &dyn SnapshotStore,
    config: &AppConfig,
    catalog: &PlatformsFile,
    platforms: &[String],
    max_chars: usize,
) -> anyhow::Result<()> {
    let analyses = gather(store, config, platforms).await?;
    publish_report(&analyses, catalog, &config.report_path, max_chars)?;
    publish_export(&analyses, config, catalog, &config.export_path)
}

pub(crate) async fn run_history(
    store: &dyn SnapshotStore,
    platform: &str,
    item_id: &str,
    days: u32,
) -> anyhow::Result<()> {
    let days = days.min(MAX_WINDOW_DAYS);
    let cutoff = window_cutoff(Utc::now(), Duration::days(i64::from(days)));
    let points = store.item_history(platform, item_id, cutoff).await?;

    if points.is_empty() {
        println!(
            "no history found for {item_id} on {platform} in the last {days} day(s); \
             run `dramatrack collect` first"
        );
        return Ok(());
    }

    println!("{:<18}{:>6}{:>14}{:>12}", "CAPTURED", "RANK", "READS", "COLLECTS");
    for p in &points {
        println!(
            "{:<18}{:>6}{:>14}{:>12}",
            p.captured_at.format("%Y-%m-%d %H:%M").to_string(),
            p.rank,
            p.read_count,
            p.collect_count
        );
    }
    Ok(())
}

#[cfg(test)]
#[path = "analyze_test.rs"]
mod tests;
