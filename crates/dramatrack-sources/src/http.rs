use std::time::Duration;

use async_trait::async_trait;
use dramatrack_core::{AppConfig, ScrapedItem};
use reqwest::Client;

use crate::feed::FeedDocument;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::{PlatformSource, SourceError};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// HTTP client settings shared by every feed source in a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl FetchSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.fetch_timeout_secs,
            user_agent: config.fetch_user_agent.clone(),
            retry: RetryPolicy {
                max_retries: config.fetch_max_retries,
                backoff_base_ms: config.fetch_backoff_base_ms,
            },
        }
    }

    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the `reqwest::Client` cannot be built.
    pub fn build_client(&self) -> Result<Client, SourceError> {
        Ok(Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(&self.user_agent)
            .build()?)
    }
}

/// Reads a platform's ranking from a normalized JSON feed over HTTP(S).
///
/// 429, 5xx, and network failures are retried per the [`RetryPolicy`];
/// 404 and other statuses fail immediately.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    platform: String,
    url: String,
    client: Client,
    retry: RetryPolicy,
}

impl HttpFeedSource {
    #[must_use]
    pub fn new(
        platform: impl Into<String>,
        url: impl Into<String>,
        client: Client,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            platform: platform.into(),
            url: url.into(),
            client,
            retry,
        }
    }

    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn from_settings(
        platform: impl Into<String>,
        url: impl Into<String>,
        settings: &FetchSettings,
    ) -> Result<Self, SourceError> {
        Ok(Self::new(
            platform,
            url,
            settings.build_client()?,
            settings.retry,
        ))
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_document(&self) -> Result<FeedDocument, SourceError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(SourceError::RateLimited {
                url: self.url.clone(),
                retry_after_secs,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound {
                url: self.url.clone(),
            });
        }

        if !status.is_success() {
            return Err(SourceError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let body = response.text().await?;
        FeedDocument::parse(&body, &format!("{} feed from {}", self.platform, self.url))
    }
}

#[async_trait]
impl PlatformSource for HttpFeedSource {
    fn platform(&self) -> &str {
        &self.platform
    }

    async fn fetch(&self, top_n: usize) -> Result<Vec<ScrapedItem>, SourceError> {
        let document = retry_with_backoff(self.retry, || self.fetch_document()).await?;
        let items = document.into_top_items(&self.platform, top_n)?;
        tracing::debug!(
            platform = %self.platform,
            url = %self.url,
            items = items.len(),
            "feed fetched"
        );
        Ok(items)
    }
}
