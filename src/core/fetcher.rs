use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::debug;

use crate::config::{FetcherConfig, SourceKind};
use crate::error::{DocwatchError, Result};

/// Outcome of fetching one documentation page.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub page_slug: String,
    pub content: Option<String>,
    pub status_code: u16,
    pub error: Option<String>,
}

impl FetchResult {
    fn success(page_slug: &str, content: String) -> Self {
        Self {
            page_slug: page_slug.to_string(),
            content: Some(content),
            status_code: 200,
            error: None,
        }
    }

    fn failure(page_slug: &str, status_code: u16, error: String) -> Self {
        Self {
            page_slug: page_slug.to_string(),
            content: None,
            status_code,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200 && self.content.is_some()
    }
}

/// Async fetcher for one source's documentation pages.
#[derive(Clone)]
pub struct DocumentFetcher {
    client: reqwest::Client,
    kind: SourceKind,
    config: FetcherConfig,
}

impl DocumentFetcher {
    pub fn new(kind: SourceKind, config: FetcherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| DocwatchError::Fetch(e.to_string()))?;

        Ok(Self {
            client,
            kind,
            config,
        })
    }

    /// Fetch URL for a page, dispatched over the source kind.
    pub fn page_url(&self, slug: &str) -> String {
        self.kind.page_url(slug)
    }

    /// Fetch a single page. HTTP errors and timeouts become failure results,
    /// never crate errors - a bad page must not abort the run.
    pub async fn fetch_page(&self, slug: &str) -> FetchResult {
        let url = self.page_url(slug);
        debug!("Fetching {}", url);

        match self.client.get(&url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if status == 200 {
                    match response.text().await {
                        Ok(text) => FetchResult::success(slug, text),
                        Err(e) => {
                            FetchResult::failure(slug, 0, format!("Body read failed: {}", e))
                        }
                    }
                } else {
                    FetchResult::failure(slug, status, format!("HTTP {}", status))
                }
            }
            Err(e) if e.is_timeout() => {
                FetchResult::failure(slug, 0, format!("Connection timed out: {}", e))
            }
            Err(e) => FetchResult::failure(slug, 0, e.to_string()),
        }
    }

    /// Fetch with exponential backoff. Client errors (4xx) are not retried.
    pub async fn fetch_page_with_retry(&self, slug: &str) -> FetchResult {
        let max_attempts = self.config.retry_count.max(1);
        let mut last_result = None;

        for attempt in 0..max_attempts {
            let result = self.fetch_page(slug).await;
            if result.is_success() {
                return result;
            }
            if (400..500).contains(&result.status_code) {
                return result;
            }
            last_result = Some(result);

            if attempt + 1 < max_attempts {
                let backoff = Duration::from_secs(1 << attempt);
                debug!("Retrying {} after {:?}", slug, backoff);
                tokio::time::sleep(backoff).await;
            }
        }

        last_result
            .unwrap_or_else(|| FetchResult::failure(slug, 0, "Max retries exceeded".to_string()))
    }

    /// Fetch many pages with bounded concurrency and an inter-request delay
    /// to stay polite with rate limits. Results come back in input order.
    pub async fn fetch_all(&self, pages: &[String]) -> Vec<FetchResult> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let delay = Duration::from_millis(self.config.delay_ms);

        let mut handles = Vec::with_capacity(pages.len());
        for slug in pages {
            let fetcher = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let slug = slug.clone();
            handles.push((
                slug.clone(),
                tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return FetchResult::failure(&slug, 0, "Fetch pool closed".to_string())
                        }
                    };
                    let result = fetcher.fetch_page_with_retry(&slug).await;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    result
                }),
            ));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (slug, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    results.push(FetchResult::failure(&slug, 0, format!("Task failed: {}", e)))
                }
            }
        }
        results
    }
}
