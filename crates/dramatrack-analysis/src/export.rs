//! Structured JSON export of the latest analysis for downstream consumers.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use dramatrack_core::{ItemRecord, PlatformsFile};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AnalysisResult, PlatformAnalysis, TrendResult};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize export document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write export file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub generated_at: DateTime<Utc>,
    /// Most recent capture across all exported platforms.
    pub latest_capture: Option<DateTime<Utc>>,
    pub top_n: usize,
    pub trend_window_days: i64,
    pub platform_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformExport {
    pub name: String,
    pub has_sufficient_history: bool,
    pub previous_captured_at: Option<DateTime<Utc>>,
    pub current_captured_at: Option<DateTime<Utc>>,
    /// The full current snapshot, rank ascending.
    pub current: Vec<ItemRecord>,
    pub changes: Option<AnalysisResult>,
    pub trend: Option<TrendResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub metadata: ExportMetadata,
    /// Keyed by platform id.
    pub platforms: BTreeMap<String, PlatformExport>,
}

impl ExportDocument {
    #[must_use]
    pub fn build(
        analyses: &[PlatformAnalysis],
        catalog: &PlatformsFile,
        top_n: usize,
        trend_window: Duration,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let platforms: BTreeMap<String, PlatformExport> = analyses
            .iter()
            .map(|a| {
                let export = PlatformExport {
                    name: catalog.display_name(&a.platform).to_string(),
                    has_sufficient_history: a.has_sufficient_history,
                    previous_captured_at: a.previous_captured_at,
                    current_captured_at: a.current.as_ref().map(|s| s.captured_at),
                    current: a
                        .current
                        .as_ref()
                        .map(|s| s.items.clone())
                        .unwrap_or_default(),
                    changes: a.analysis.clone(),
                    trend: a.trend.clone(),
                };
                (a.platform.clone(), export)
            })
            .collect();

        Self {
            metadata: ExportMetadata {
                generated_at,
                latest_capture: platforms.values().filter_map(|p| p.current_captured_at).max(),
                top_n,
                trend_window_days: trend_window.num_days(),
                platform_count: platforms.len(),
            },
            platforms,
        }
    }
}

/// Write `document` as pretty JSON to `path`.
///
/// The document is written to a temporary file in the target directory and
/// renamed into place, so readers never observe a partial file.
///
/// # Errors
///
/// Returns [`ExportError`] if serialization or any filesystem step fails.
pub fn write_export(document: &ExportDocument, path: &Path) -> Result<(), ExportError> {
    let io_err = |source: std::io::Error| ExportError::Io {
        path: path.display().to_string(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let body = serde_json::to_vec_pretty(document)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&body).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    tracing::info!(
        path = %path.display(),
        platforms = document.platforms.len(),
        "analysis exported"
    );
    Ok(())
}
