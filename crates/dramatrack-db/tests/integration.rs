//! Offline unit tests for dramatrack-db pool configuration and row types.
//! These tests do not require a live database connection.

use std::path::PathBuf;

use chrono::Utc;
use dramatrack_core::{AnalyzerConfig, AppConfig, Environment};
use dramatrack_db::{CaptureRunRow, PlatformOutcome, PoolConfig};
use uuid::Uuid;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        platforms_path: PathBuf::from("./config/platforms.yaml"),
        platforms: vec!["reelshort".to_string()],
        top_n: 50,
        analyzer: AnalyzerConfig::default(),
        trend_window_days: 7,
        export_path: PathBuf::from("./analysis_data.json"),
        report_path: PathBuf::from("./latest_report.txt"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        fetch_timeout_secs: 30,
        fetch_user_agent: "ua".to_string(),
        max_concurrent_platforms: 1,
        fetch_max_retries: 3,
        fetch_backoff_base_ms: 1000,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn capture_run_row_has_expected_fields() {
    let row = CaptureRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        trigger_source: "cli".to_string(),
        status: "queued".to_string(),
        started_at: None,
        completed_at: None,
        records_processed: 0_i32,
        error_message: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.id, 1);
    assert_eq!(row.trigger_source, "cli");
    assert_eq!(row.status, "queued");
    assert!(row.started_at.is_none());
    assert_eq!(row.records_processed, 0);
}

#[test]
fn platform_outcome_succeeded_carries_snapshot() {
    let outcome = PlatformOutcome::succeeded("reelshort", 50, 1200, 17);
    assert_eq!(outcome.status(), "succeeded");
    assert_eq!(outcome.snapshot_id, Some(17));
    assert!(outcome.error_message.is_none());
}

#[test]
fn platform_outcome_failed_has_no_records() {
    let outcome = PlatformOutcome::failed("dramabox", 30_000, "request timed out");
    assert_eq!(outcome.status(), "failed");
    assert_eq!(outcome.records_processed, 0);
    assert_eq!(outcome.snapshot_id, None);
    assert_eq!(outcome.error_message.as_deref(), Some("request timed out"));
}
