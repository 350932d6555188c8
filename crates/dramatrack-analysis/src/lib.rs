//! Change analysis, genre trends, and the report/export surfaces built on
//! top of a [`dramatrack_core::SnapshotStore`].

pub mod analyzer;
pub mod export;
pub mod pipeline;
pub mod report;
pub mod trends;
pub mod types;

pub use analyzer::ChangeAnalyzer;
pub use export::{write_export, ExportDocument, ExportError, ExportMetadata, PlatformExport};
pub use pipeline::{analyze_platform, analyze_platforms};
pub use report::{render_report, DEFAULT_REPORT_MAX_CHARS};
pub use trends::{TrendAggregator, DEFAULT_TREND_WINDOW_DAYS};
pub use types::{
    AnalysisResult, CategoryTotals, DroppedEntry, GenreTrend, Growth, MetricSurge, NewEntry,
    PlatformAnalysis, RankChange, TrendDirection, TrendResult,
};
