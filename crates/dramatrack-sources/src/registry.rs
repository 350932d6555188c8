use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use dramatrack_core::{Availability, FeedSource, PlatformsFile};

use crate::http::{FetchSettings, HttpFeedSource};
use crate::{JsonFileSource, PlatformSource, SourceError};

/// Platform id to source capability map, built once at startup.
#[derive(Default)]
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn PlatformSource>>,
    /// Catalog platforms without a usable source, with the reason.
    unavailable: BTreeMap<String, String>,
}

impl SourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build sources for every catalog platform that is available and has a
    /// feed configured. Relative file paths resolve against `catalog_dir`.
    ///
    /// All HTTP sources share one `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn from_catalog(
        catalog: &PlatformsFile,
        settings: &FetchSettings,
        catalog_dir: &Path,
    ) -> Result<Self, SourceError> {
        let client = settings.build_client()?;
        let mut registry = Self::new();

        for platform in &catalog.platforms {
            if platform.status == Availability::Unreachable {
                registry
                    .unavailable
                    .insert(platform.id.clone(), "marked unreachable in catalog".to_string());
                continue;
            }
            match &platform.source {
                Some(FeedSource::Http { url }) => {
                    let source = HttpFeedSource::new(
                        platform.id.clone(),
                        url.clone(),
                        client.clone(),
                        settings.retry,
                    );
                    tracing::debug!(
                        platform = %platform.id,
                        url = source.url(),
                        "http feed registered"
                    );
                    registry.register(Arc::new(source));
                }
                Some(FeedSource::File { path }) => registry.register(Arc::new(
                    JsonFileSource::new(platform.id.clone(), catalog_dir.join(path)),
                )),
                None => {
                    registry
                        .unavailable
                        .insert(platform.id.clone(), "no feed configured".to_string());
                }
            }
        }

        tracing::debug!(
            sources = registry.sources.len(),
            unavailable = registry.unavailable.len(),
            "source registry built"
        );
        Ok(registry)
    }

    /// Add or replace the source for its platform.
    pub fn register(&mut self, source: Arc<dyn PlatformSource>) {
        let id = source.platform().to_string();
        self.unavailable.remove(&id);
        self.sources.insert(id, source);
    }

    /// # Errors
    ///
    /// Returns [`SourceError::Unavailable`] for catalog platforms without a
    /// usable source, or [`SourceError::UnknownPlatform`] otherwise.
    pub fn get(&self, platform: &str) -> Result<Arc<dyn PlatformSource>, SourceError> {
        if let Some(source) = self.sources.get(platform) {
            return Ok(Arc::clone(source));
        }
        match self.unavailable.get(platform) {
            Some(reason) => Err(SourceError::Unavailable {
                platform: platform.to_string(),
                reason: reason.clone(),
            }),
            None => Err(SourceError::UnknownPlatform(platform.to_string())),
        }
    }

    /// Ids with a registered source, sorted.
    #[must_use]
    pub fn platform_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sources.keys().cloned().collect();
        ids.sort();
        ids
    }
}
