use std::path::PathBuf;

use crate::thresholds::AnalyzerConfig;

/// Longest trailing window, in days, accepted for trends and item history.
pub const MAX_WINDOW_DAYS: u32 = 3650;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub platforms_path: PathBuf,
    /// Platform ids processed by a default run, in configured order.
    pub platforms: Vec<String>,
    /// Capture depth; the highest rank a snapshot is expected to contain.
    pub top_n: usize,
    pub analyzer: AnalyzerConfig,
    pub trend_window_days: u32,
    pub export_path: PathBuf,
    pub report_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub fetch_user_agent: String,
    pub max_concurrent_platforms: usize,
    pub fetch_max_retries: u32,
    pub fetch_backoff_base_ms: u64,
}

impl AppConfig {
    #[must_use]
    pub fn trend_window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.trend_window_days))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("platforms_path", &self.platforms_path)
            .field("database_url", &"[redacted]")
            .field("platforms", &self.platforms)
            .field("top_n", &self.top_n)
            .field("analyzer", &self.analyzer)
            .field("trend_window_days", &self.trend_window_days)
            .field("export_path", &self.export_path)
            .field("report_path", &self.report_path)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("fetch_user_agent", &self.fetch_user_agent)
            .field("max_concurrent_platforms", &self.max_concurrent_platforms)
            .field("fetch_max_retries", &self.fetch_max_retries)
            .field("fetch_backoff_base_ms", &self.fetch_backoff_base_ms)
            .finish()
    }
}
