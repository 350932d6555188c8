use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dramatrack_core::ScrapedItem;

use crate::feed::FeedDocument;
use crate::{PlatformSource, SourceError};

/// Reads a platform's ranking from a feed document on disk.
///
/// Used for platforms whose capture happens out of process and for
/// replaying saved captures.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    platform: String,
    path: PathBuf,
}

impl JsonFileSource {
    #[must_use]
    pub fn new(platform: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            platform: platform.into(),
            path: path.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PlatformSource for JsonFileSource {
    fn platform(&self) -> &str {
        &self.platform
    }

    async fn fetch(&self, top_n: usize) -> Result<Vec<ScrapedItem>, SourceError> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceError::Io {
                path: self.path.display().to_string(),
                source: e,
            })?;
        let context = format!("{} feed file {}", self.platform, self.path.display());
        FeedDocument::parse(&body, &context)?.into_top_items(&self.platform, top_n)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn reads_and_truncates_feed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"items": [
                {{"item_id": "b", "title": "B", "rank": 2, "read_count": 10}},
                {{"item_id": "a", "title": "A", "rank": 1, "read_count": 20}},
                {{"item_id": "c", "title": "C", "rank": 3}}
            ]}}"#
        )
        .unwrap();

        let source = JsonFileSource::new("hongguo", file.path());
        let items = source.fetch(2).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].item_id, "a");
        assert_eq!(items[0].read_count, 20);
        assert_eq!(items[1].item_id, "b");
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let source = JsonFileSource::new("hongguo", "/nonexistent/hongguo.json");
        let err = source.fetch(10).await.unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[tokio::test]
    async fn malformed_file_is_deserialize_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2, 3]").unwrap();
        let source = JsonFileSource::new("hongguo", file.path());
        let err = source.fetch(10).await.unwrap_err();
        assert!(matches!(err, SourceError::Deserialize { .. }));
    }
}
