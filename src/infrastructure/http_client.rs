//! HTTP client for fetching search-result pages
//!
//! Sends the configured static headers with every request. A non-success
//! status is reported as `PageFetch::Failed`, not as an error.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use std::time::Duration;
use url::Url;

use crate::domain::services::{PageFetch, PageSource};
use crate::infrastructure::config::{HeaderEntry, SourceConfig};

/// HTTP client configuration for page fetching
#[derive(Debug, Clone, serde::Serialize)]
pub struct HttpClientConfig {
    pub search_url: String,
    pub timeout_seconds: u64,
    pub headers: Vec<HeaderEntry>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from(&SourceConfig::default())
    }
}

impl From<&SourceConfig> for HttpClientConfig {
    fn from(source: &SourceConfig) -> Self {
        Self {
            search_url: source.search_url.clone(),
            timeout_seconds: source.timeout_seconds,
            headers: source.headers.clone(),
        }
    }
}

pub struct HttpClient {
    client: Client,
    search_url: Url,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let headers = build_headers(&config.headers)?;
        let search_url = Url::parse(&config.search_url)
            .with_context(|| format!("Invalid search URL: {}", config.search_url))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, search_url })
    }

    /// URL for page `page`: the search URL with `page=N` set.
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.search_url.clone();
        let retained: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "page")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        url.query_pairs_mut()
            .clear()
            .extend_pairs(retained)
            .append_pair("page", &page.to_string());
        url
    }
}

#[async_trait]
impl PageSource for HttpClient {
    async fn fetch_page(&self, page: u32) -> Result<PageFetch> {
        let url = self.page_url(page);
        tracing::info!("Fetching search page {}: {}", page, url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch URL: {url}"))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Search page {} returned status {}", page, status);
            return Ok(PageFetch::Failed {
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from: {url}"))?;

        tracing::debug!("Successfully fetched: {} ({} chars)", url, text.len());
        Ok(PageFetch::Success(text))
    }
}

fn build_headers(entries: &[HeaderEntry]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for entry in entries {
        let name = HeaderName::from_bytes(entry.name.as_bytes())
            .with_context(|| format!("Invalid header name: {}", entry.name))?;
        let value = HeaderValue::from_str(&entry.value)
            .with_context(|| format!("Invalid value for header {}", entry.name))?;
        headers.insert(name, value);
    }
    Ok(headers)
}
