use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment, MAX_WINDOW_DAYS};
use crate::thresholds::AnalyzerConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation live here, decoupled from the process environment,
/// so tests can drive it with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("DRAMATRACK_ENV", "development"))?;
    let log_level = or_default("DRAMATRACK_LOG_LEVEL", "info");
    let platforms_path = PathBuf::from(or_default(
        "DRAMATRACK_PLATFORMS_PATH",
        "./config/platforms.yaml",
    ));
    let platforms = parse_platform_list(&or_default("DRAMATRACK_PLATFORMS", "reelshort"))?;
    let top_n: usize = parse_var(&lookup, "DRAMATRACK_TOP_N", "50")?;

    let rank_surge_threshold: u32 = parse_var(&lookup, "DRAMATRACK_RANK_SURGE_THRESHOLD", "10")?;
    let rank_drop_threshold = match lookup("DRAMATRACK_RANK_DROP_THRESHOLD") {
        Ok(raw) => Some(parse_raw::<u32>("DRAMATRACK_RANK_DROP_THRESHOLD", &raw)?),
        Err(_) => None,
    };
    let read_count_surge_pct: f64 = parse_var(&lookup, "DRAMATRACK_READ_COUNT_SURGE_PCT", "50")?;
    let collect_surge_pct: f64 = parse_var(&lookup, "DRAMATRACK_COLLECT_SURGE_PCT", "30")?;
    let report_max_items: usize = parse_var(&lookup, "DRAMATRACK_REPORT_MAX_ITEMS", "10")?;
    let trend_window_days: u32 = parse_var(&lookup, "DRAMATRACK_TREND_WINDOW_DAYS", "7")?;

    let export_path = PathBuf::from(or_default("DRAMATRACK_EXPORT_PATH", "./analysis_data.json"));
    let report_path = PathBuf::from(or_default("DRAMATRACK_REPORT_PATH", "./latest_report.txt"));

    let db_max_connections: u32 = parse_var(&lookup, "DRAMATRACK_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections: u32 = parse_var(&lookup, "DRAMATRACK_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs: u64 =
        parse_var(&lookup, "DRAMATRACK_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let fetch_timeout_secs: u64 = parse_var(&lookup, "DRAMATRACK_FETCH_TIMEOUT_SECS", "30")?;
    let fetch_user_agent = or_default(
        "DRAMATRACK_FETCH_USER_AGENT",
        "dramatrack/0.1 (ranking-monitor)",
    );
    let max_concurrent_platforms: usize =
        parse_var(&lookup, "DRAMATRACK_MAX_CONCURRENT_PLATFORMS", "4")?;
    let fetch_max_retries: u32 = parse_var(&lookup, "DRAMATRACK_FETCH_MAX_RETRIES", "3")?;
    let fetch_backoff_base_ms: u64 =
        parse_var(&lookup, "DRAMATRACK_FETCH_BACKOFF_BASE_MS", "1000")?;

    ensure_positive("DRAMATRACK_TOP_N", top_n)?;
    ensure_positive("DRAMATRACK_RANK_SURGE_THRESHOLD", rank_surge_threshold)?;
    if let Some(drop) = rank_drop_threshold {
        ensure_positive("DRAMATRACK_RANK_DROP_THRESHOLD", drop)?;
    }
    ensure_percentage("DRAMATRACK_READ_COUNT_SURGE_PCT", read_count_surge_pct)?;
    ensure_percentage("DRAMATRACK_COLLECT_SURGE_PCT", collect_surge_pct)?;
    ensure_positive("DRAMATRACK_REPORT_MAX_ITEMS", report_max_items)?;
    ensure_positive("DRAMATRACK_TREND_WINDOW_DAYS", trend_window_days)?;
    if trend_window_days > MAX_WINDOW_DAYS {
        return Err(ConfigError::InvalidEnvVar {
            var: "DRAMATRACK_TREND_WINDOW_DAYS".to_string(),
            reason: format!("must be at most {MAX_WINDOW_DAYS}, got {trend_window_days}"),
        });
    }
    ensure_positive("DRAMATRACK_MAX_CONCURRENT_PLATFORMS", max_concurrent_platforms)?;

    if db_min_connections > db_max_connections {
        return Err(ConfigError::InvalidEnvVar {
            var: "DRAMATRACK_DB_MIN_CONNECTIONS".to_string(),
            reason: format!(
                "min connections ({db_min_connections}) exceeds max connections ({db_max_connections})"
            ),
        });
    }

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        platforms_path,
        platforms,
        top_n,
        analyzer: AnalyzerConfig {
            rank_surge_threshold,
            rank_drop_threshold,
            read_count_surge_pct,
            collect_surge_pct,
            report_max_items,
        },
        trend_window_days,
        export_path,
        report_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        fetch_timeout_secs,
        fetch_user_agent,
        max_concurrent_platforms,
        fetch_max_retries,
        fetch_backoff_base_ms,
    })
}

fn parse_var<T, F>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let raw = lookup(var).unwrap_or_else(|_| default.to_string());
    parse_raw(var, &raw)
}

fn parse_raw<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

fn ensure_positive<T>(var: &str, value: T) -> Result<(), ConfigError>
where
    T: PartialOrd + Default + std::fmt::Display,
{
    if value > T::default() {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("must be greater than zero, got {value}"),
        })
    }
}

fn ensure_percentage(var: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("must be a non-negative percentage, got {value}"),
        })
    }
}

/// Split a comma-separated platform list, dropping blanks and duplicates
/// while keeping the first-seen order.
fn parse_platform_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut platforms: Vec<String> = Vec::new();
    for id in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let id = id.to_lowercase();
        if !platforms.contains(&id) {
            platforms.push(id);
        }
    }
    if platforms.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "DRAMATRACK_PLATFORMS".to_string(),
            reason: "at least one platform id is required".to_string(),
        });
    }
    Ok(platforms)
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "DRAMATRACK_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
