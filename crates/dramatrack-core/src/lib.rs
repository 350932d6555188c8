//! Domain model, configuration, and the snapshot store interface shared by
//! every dramatrack crate.

pub mod app_config;
pub mod config;
pub mod memory_store;
pub mod platforms;
pub mod records;
pub mod store;
pub mod thresholds;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, MAX_WINDOW_DAYS};
pub use config::{load_app_config, load_app_config_from_env};
pub use memory_store::MemorySnapshotStore;
pub use platforms::{
    load_platforms, parse_platforms, Availability, FeedSource, PlatformConfig, PlatformsFile,
};
pub use records::{
    validate_snapshot, HistoryPoint, InvalidSnapshotError, ItemRecord, ScrapedItem, Snapshot,
    SnapshotPair,
};
pub use store::{window_cutoff, SnapshotStore, StoreError};
pub use thresholds::AnalyzerConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read platforms file {path}: {source}")]
    PlatformsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse platforms file: {0}")]
    PlatformsFileParse(#[source] serde_yaml::Error),

    #[error("platform catalog validation failed: {0}")]
    Validation(String),
}
