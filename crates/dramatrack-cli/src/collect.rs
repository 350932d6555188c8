//! `collect`: fetch each selected platform and append one snapshot per
//! platform, recording the work as a capture run.

use std::time::Instant;

use chrono::{DateTime, Utc};
use dramatrack_core::{validate_snapshot, AppConfig, ItemRecord, PlatformsFile, SnapshotStore};
use dramatrack_db::PlatformOutcome;
use dramatrack_sources::{FetchSettings, SourceRegistry};
use futures::stream::{self, StreamExt};

const TRIGGER_SOURCE: &str = "cli";

/// Totals for one collect invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CollectTotals {
    pub platforms: usize,
    pub failed: usize,
    pub records: i32,
}

pub(crate) fn build_registry(
    config: &AppConfig,
    catalog: &PlatformsFile,
) -> anyhow::Result<SourceRegistry> {
    let settings = FetchSettings::from_app_config(config);
    Ok(SourceRegistry::from_catalog(
        catalog,
        &settings,
        crate::catalog_dir(config),
    )?)
}

/// Fetch one platform's top `top_n` items stamped with `captured_at`.
///
/// An empty ranking is an error: storing it would read as every item
/// dropping out on the next analysis.
async fn fetch_records(
    registry: &SourceRegistry,
    platform: &str,
    top_n: usize,
    captured_at: DateTime<Utc>,
) -> anyhow::Result<Vec<ItemRecord>> {
    let source = registry.get(platform)?;
    let items = source.fetch(top_n).await?;
    if items.is_empty() {
        anyhow::bail!("{platform} returned no ranked items");
    }
    Ok(items
        .into_iter()
        .map(|item| item.into_record(platform, captured_at))
        .collect())
}

/// Fetch and store one platform. Returns the stored snapshot's sequence and
/// item count.
pub(crate) async fn capture_platform(
    store: &dyn SnapshotStore,
    registry: &SourceRegistry,
    platform: &str,
    top_n: usize,
    captured_at: DateTime<Utc>,
) -> anyhow::Result<(i64, usize)> {
    let records = fetch_records(registry, platform, top_n, captured_at).await?;
    let snapshot = store.append(platform, captured_at, records).await?;
    Ok((snapshot.sequence, snapshot.len()))
}

/// Fetch and validate one platform without storing anything.
async fn check_platform(
    registry: &SourceRegistry,
    platform: &str,
    top_n: usize,
    captured_at: DateTime<Utc>,
) -> anyhow::Result<usize> {
    let records = fetch_records(registry, platform, top_n, captured_at).await?;
    validate_snapshot(platform, &records)?;
    Ok(records.len())
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}

fn records_i32(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

/// Process every platform concurrently, bounded by `max_concurrent`.
///
/// One platform failing never aborts the others. Outcomes come back in the
/// order of `platforms`.
pub(crate) async fn collect_platforms(
    store: &dyn SnapshotStore,
    registry: &SourceRegistry,
    platforms: &[String],
    top_n: usize,
    captured_at: DateTime<Utc>,
    max_concurrent: usize,
    dry_run: bool,
) -> Vec<PlatformOutcome> {
    let mut outcomes: Vec<(usize, PlatformOutcome)> = stream::iter(platforms.iter().enumerate())
        .map(|(index, platform)| async move {
            let started = Instant::now();
            let outcome = if dry_run {
                match check_platform(registry, platform, top_n, captured_at).await {
                    Ok(count) => {
                        println!("{platform}: {count} item(s) fetched (dry run, not stored)");
                        PlatformOutcome {
                            platform: platform.clone(),
                            succeeded: true,
                            records_processed: records_i32(count),
                            duration_ms: elapsed_ms(started),
                            error_message: None,
                            snapshot_id: None,
                        }
                    }
                    Err(e) => PlatformOutcome::failed(
                        platform.as_str(),
                        elapsed_ms(started),
                        format!("{e:#}"),
                    ),
                }
            } else {
                match capture_platform(store, registry, platform, top_n, captured_at).await {
                    Ok((sequence, count)) => {
                        tracing::info!(platform = %platform, items = count, sequence, "snapshot stored");
                        PlatformOutcome::succeeded(
                            platform.as_str(),
                            records_i32(count),
                            elapsed_ms(started),
                            sequence,
                        )
                    }
                    Err(e) => PlatformOutcome::failed(
                        platform.as_str(),
                        elapsed_ms(started),
                        format!("{e:#}"),
                    ),
                }
            };
            if let Some(message) = &outcome.error_message {
                tracing::error!(platform = %platform, error = %message, "platform capture failed");
            }
            (index, outcome)
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    outcomes.sort_by_key(|(index, _)| *index);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

pub(crate) fn summarize(outcomes: &[PlatformOutcome]) -> CollectTotals {
    CollectTotals {
        platforms: outcomes.len(),
        failed: outcomes.iter().filter(|o| !o.succeeded).count(),
        records: outcomes
            .iter()
            .fold(0_i32, |acc, o| acc.saturating_add(o.records_processed)),
    }
}

/// Run a full collect: capture-run lifecycle plus one snapshot per platform.
///
/// Every platform in one invocation shares a single `captured_at`.
///
/// # Errors
///
/// Fails when no platforms are selected, when every platform failed, or when
/// the capture run cannot be created or transitioned.
pub(crate) async fn run_collect(
    pool: &sqlx::PgPool,
    store: &dyn SnapshotStore,
    registry: &SourceRegistry,
    config: &AppConfig,
    platforms: &[String],
    dry_run: bool,
) -> anyhow::Result<CollectTotals> {
    if platforms.is_empty() {
        anyhow::bail!("no platforms selected; set DRAMATRACK_PLATFORMS or pass --platform");
    }

    let captured_at = Utc::now();
    let max_concurrent = config.max_concurrent_platforms;

    if dry_run {
        let outcomes = collect_platforms(
            store,
            registry,
            platforms,
            config.top_n,
            captured_at,
            max_concurrent,
            true,
        )
        .await;
        let totals = summarize(&outcomes);
        print_outcomes(&outcomes);
        if totals.failed == totals.platforms {
            anyhow::bail!("all {} platforms failed (dry run)", totals.failed);
        }
        return Ok(totals);
    }

    let run = dramatrack_db::create_capture_run(pool, TRIGGER_SOURCE).await?;
    if let Err(e) = dramatrack_db::start_capture_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
        return Err(e.into());
    }
    tracing::info!(run_id = run.id, platforms = platforms.len(), "capture run started");

    let outcomes = collect_platforms(
        store,
        registry,
        platforms,
        config.top_n,
        captured_at,
        max_concurrent,
        false,
    )
    .await;

    for outcome in &outcomes {
        if let Err(e) = dramatrack_db::record_capture_run_platform(pool, run.id, outcome).await {
            tracing::warn!(
                run_id = run.id,
                platform = %outcome.platform,
                error = %e,
                "failed to record platform outcome"
            );
        }
    }

    let totals = summarize(&outcomes);
    print_outcomes(&outcomes);

    if totals.failed > 0 {
        tracing::warn!(
            failed_platforms = totals.failed,
            total_platforms = totals.platforms,
            "some platforms failed during collection"
        );
    }

    if totals.failed == totals.platforms {
        let message = format!("all {} platforms failed collection", totals.failed);
        fail_run_best_effort(pool, run.id, message.clone()).await;
        anyhow::bail!("{message}");
    }

    if let Err(err) = dramatrack_db::complete_capture_run(pool, run.id, totals.records).await {
        fail_run_best_effort(pool, run.id, format!("{err:#}")).await;
        return Err(err.into());
    }

    tracing::info!(
        run_id = run.id,
        records = totals.records,
        failed_platforms = totals.failed,
        "capture run complete"
    );
    Ok(totals)
}

fn print_outcomes(outcomes: &[PlatformOutcome]) {
    println!("{:<14}{:<11}{:>7}{:>10}  ERROR", "PLATFORM", "STATUS", "ITEMS", "MS");
    for o in outcomes {
        println!(
            "{:<14}{:<11}{:>7}{:>10}  {}",
            o.platform,
            o.status(),
            o.records_processed,
            o.duration_ms,
            o.error_message.as_deref().unwrap_or("")
        );
    }
}

/// Mark a run failed, logging rather than returning if that also fails.
async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, message: String) {
    if let Err(mark_err) = dramatrack_db::fail_capture_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark capture run as failed"
        );
    }
}

#[cfg(test)]
#[path = "collect_test.rs"]
mod tests;
