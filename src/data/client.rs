//! WordPress REST API client
//!
//! Issues unauthenticated GET requests against `<host>/wp-json/` and returns
//! parsed JSON. Media listings are walked page by page up to a fixed cap.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Core WordPress REST namespace, also used for detection
pub const WP_NAMESPACE: &str = "wp/v2/";

/// Highest page number requested by a paginated fetch
pub const MAX_PAGES: u32 = 500;

/// Response header carrying the total page count of a collection
const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

/// Errors that can occur when fetching from a WordPress site
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the response could not be read
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { status: StatusCode, url: String },

    /// The response body was not JSON
    #[error("Failed to parse JSON response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result of fetching a single page of a collection
enum Page {
    /// Records on this page, with the collection's page count if advertised
    Items {
        items: Vec<Value>,
        total_pages: Option<u32>,
    },
    /// The collection has no more pages
    End,
}

/// Client for a WordPress site's REST API
#[derive(Debug, Clone)]
pub struct WpClient {
    http_client: Client,
    /// URL scheme, `https` unless overridden
    scheme: String,
}

impl Default for WpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WpClient {
    /// Create a new WpClient with default settings
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a new WpClient with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            http_client: client,
            scheme: "https".to_string(),
        }
    }

    /// Create a new WpClient whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    /// Use a different URL scheme (e.g. `http` for a local test server)
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Builds `<scheme>://<host>/wp-json/<endpoint>`
    pub fn endpoint_url(&self, host: &str, endpoint: &str) -> String {
        format!("{}://{}/wp-json/{}", self.scheme, host, endpoint)
    }

    /// Checks whether `host` serves the WordPress REST API
    ///
    /// Returns true only when `wp-json/wp/v2/` answers HTTP 200. Network
    /// failures count as "not WordPress".
    pub async fn detect(&self, host: &str) -> bool {
        let url = self.endpoint_url(host, WP_NAMESPACE);
        debug!(%url, "probing for WordPress");

        match self.http_client.get(&url).send().await {
            Ok(response) => {
                debug!(status = %response.status(), "detection response");
                response.status() == StatusCode::OK
            }
            Err(e) => {
                debug!(error = %e, "detection request failed");
                false
            }
        }
    }

    /// Fetches one endpoint and returns its parsed JSON body
    ///
    /// # Arguments
    /// * `host` - The WordPress host, optionally with a port
    /// * `endpoint` - Path below `wp-json/`, e.g. `wp/v2/users`
    /// * `query` - Extra query parameters
    pub async fn fetch_single(
        &self,
        host: &str,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, FetchError> {
        let url = self.endpoint_url(host, endpoint);
        debug!(%url, "fetching");

        let response = self.http_client.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status, url });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|source| FetchError::Decode { url, source })
    }

    /// Fetches every page of a collection endpoint
    ///
    /// Requests pages 1 through [`MAX_PAGES`] and stops early on an empty
    /// page, on the last page advertised by `X-WP-TotalPages`, or when
    /// WordPress rejects a page number past the end. `on_page` is called with
    /// each non-empty page as soon as it arrives.
    ///
    /// # Returns
    /// * `Ok(records)` - All records of all pages, in order
    /// * `Err(FetchError)` - If any page fails
    pub async fn fetch_paginated<F>(
        &self,
        host: &str,
        endpoint: &str,
        query: &[(&str, &str)],
        mut on_page: F,
    ) -> Result<Vec<Value>, FetchError>
    where
        F: FnMut(u32, &[Value]),
    {
        let url = self.endpoint_url(host, endpoint);
        let mut records = Vec::new();

        for page in 1..=MAX_PAGES {
            debug!(%url, page, "fetching page");

            let (items, total_pages) = match self.fetch_page(&url, query, page).await? {
                Page::Items { items, total_pages } => (items, total_pages),
                Page::End => break,
            };
            if items.is_empty() {
                break;
            }

            debug!(page, count = items.len(), "received page");
            on_page(page, &items);
            records.extend(items);

            if total_pages.is_some_and(|total| page >= total) {
                break;
            }
        }

        Ok(records)
    }

    async fn fetch_page(
        &self,
        url: &str,
        query: &[(&str, &str)],
        page: u32,
    ) -> Result<Page, FetchError> {
        let response = self
            .http_client
            .get(url)
            .query(query)
            .query(&[("page", page)])
            .send()
            .await?;

        let status = response.status();
        // WordPress answers 400 rest_post_invalid_page_number past the last page
        if status == StatusCode::BAD_REQUEST && page > 1 {
            debug!(page, "page number past the end of the collection");
            return Ok(Page::End);
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }

        let total_pages = response
            .headers()
            .get(TOTAL_PAGES_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());

        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })?;

        match body {
            Value::Array(items) => Ok(Page::Items { items, total_pages }),
            other => {
                warn!(page, body = %other, "expected a JSON array page, stopping");
                Ok(Page::End)
            }
        }
    }
}
