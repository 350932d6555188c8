//! `runs`: inspect capture run history.

use chrono::{DateTime, Utc};
use dramatrack_db::{CaptureRunPlatformRow, CaptureRunRow};

fn fmt_time(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Wall-clock duration of a finished run in seconds, if both ends are set.
pub(crate) fn run_duration_secs(run: &CaptureRunRow) -> Option<i64> {
    match (run.started_at, run.completed_at) {
        (Some(start), Some(end)) => Some((end - start).num_seconds()),
        _ => None,
    }
}

pub(crate) fn run_line(run: &CaptureRunRow) -> String {
    format!(
        "{:<8}{:<11}{:<21}{:>9}{:>9}  {}",
        run.id,
        run.status,
        fmt_time(run.started_at),
        run.records_processed,
        run_duration_secs(run).map_or_else(|| "-".to_string(), |s| format!("{s}s")),
        run.error_message.as_deref().unwrap_or("")
    )
}

fn platform_line(row: &CaptureRunPlatformRow) -> String {
    format!(
        "{:<14}{:<11}{:>7}{:>10}  {}",
        row.platform,
        row.status,
        row.records_processed,
        row.duration_ms.map_or_else(|| "-".to_string(), |ms| ms.to_string()),
        row.error_message.as_deref().unwrap_or("")
    )
}

pub(crate) async fn run_list(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = dramatrack_db::list_capture_runs(pool, limit.max(1)).await?;
    if runs.is_empty() {
        println!("no capture runs found; run `dramatrack collect` first");
        return Ok(());
    }

    println!(
        "{:<8}{:<11}{:<21}{:>9}{:>9}  ERROR",
        "ID", "STATUS", "STARTED", "ITEMS", "TOOK"
    );
    for run in &runs {
        println!("{}", run_line(run));
    }
    Ok(())
}

pub(crate) async fn run_show(pool: &sqlx::PgPool, id: i64) -> anyhow::Result<()> {
    let run = match dramatrack_db::get_capture_run(pool, id).await {
        Ok(run) => run,
        Err(dramatrack_db::DbError::NotFound) => anyhow::bail!("capture run {id} not found"),
        Err(e) => return Err(e.into()),
    };

    println!(
        "run {} ({}) triggered by {}: {}",
        run.id, run.public_id, run.trigger_source, run.status
    );
    println!(
        "started {}  completed {}  items {}",
        fmt_time(run.started_at),
        fmt_time(run.completed_at),
        run.records_processed
    );
    if let Some(message) = &run.error_message {
        println!("error: {message}");
    }

    let platforms = dramatrack_db::list_capture_run_platforms(pool, id).await?;
    if platforms.is_empty() {
        println!("no platform results recorded");
        return Ok(());
    }
    println!();
    println!("{:<14}{:<11}{:>7}{:>10}  ERROR", "PLATFORM", "STATUS", "ITEMS", "MS");
    for row in &platforms {
        println!("{}", platform_line(row));
    }
    Ok(())
}
