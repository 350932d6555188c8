use dramatrack_core::ScrapedItem;
use serde::{Deserialize, Serialize};

use crate::SourceError;

/// Normalized ranking feed shared by the HTTP and file sources.
///
/// ```json
/// {"platform": "reelshort", "items": [{"item_id": "a1", "title": "...", "rank": 1}]}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedDocument {
    #[serde(default)]
    pub platform: Option<String>,
    pub items: Vec<ScrapedItem>,
}

impl FeedDocument {
    /// Parse a feed body, labelling decode errors with `context`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Deserialize`] if the body is not a feed document.
    pub fn parse(body: &str, context: &str) -> Result<Self, SourceError> {
        serde_json::from_str(body).map_err(|e| SourceError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }

    /// Check the declared platform and keep the `top_n` best-ranked items.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::PlatformMismatch`] if the document names a
    /// different platform than `platform`.
    pub fn into_top_items(
        self,
        platform: &str,
        top_n: usize,
    ) -> Result<Vec<ScrapedItem>, SourceError> {
        if let Some(found) = self.platform {
            if found != platform {
                return Err(SourceError::PlatformMismatch {
                    expected: platform.to_string(),
                    found,
                });
            }
        }
        let mut items = self.items;
        items.sort_by_key(|i| i.rank);
        items.truncate(top_n);
        Ok(items)
    }
}
