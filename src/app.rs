//! Application flow for wpprobe
//!
//! Detects WordPress on the configured host, then lists each selected
//! resource: from the cache when a fresh entry exists, otherwise from the
//! REST API, saving what was fetched.

use std::io::{self, Write};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheError, CacheManager};
use crate::cli::AppConfig;
use crate::data::{FetchError, Resource, WpClient};
use crate::display;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The host does not serve the WordPress REST API
    NotWordPress,
    /// WordPress was detected and `--detect-only` was set
    Detected,
    /// Every selected resource was processed; `failures` could not be fetched
    Completed { failures: usize },
}

impl RunOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(self) -> u8 {
        match self {
            RunOutcome::NotWordPress => 1,
            RunOutcome::Detected | RunOutcome::Completed { failures: 0 } => 0,
            RunOutcome::Completed { .. } => 2,
        }
    }
}

/// Main application struct tying the client, cache and output together
pub struct App {
    config: AppConfig,
    client: WpClient,
    cache: CacheManager,
}

impl App {
    /// Creates a new App from configuration, building an HTTP client that
    /// honours the configured timeout
    pub fn new(config: AppConfig) -> Result<Self, FetchError> {
        let client = match config.timeout {
            Some(timeout) => WpClient::with_timeout(timeout)?,
            None => WpClient::new(),
        };
        Ok(Self::with_client(config, client))
    }

    /// Creates a new App with a custom client
    pub fn with_client(config: AppConfig, client: WpClient) -> Self {
        let cache = CacheManager::with_dir(config.cache_dir.clone());
        Self {
            config,
            client,
            cache,
        }
    }

    /// Configuration this app was built with
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Runs detection and lists the selected resources to `out`
    ///
    /// A resource that fails to fetch is logged and counted; the remaining
    /// resources are still processed.
    pub async fn run<W: Write>(&self, out: &mut W) -> io::Result<RunOutcome> {
        let host = &self.config.host;

        if !self.client.detect(host).await {
            return Ok(RunOutcome::NotWordPress);
        }
        if self.config.detect_only {
            info!(%host, "WordPress detected");
            return Ok(RunOutcome::Detected);
        }

        if self.config.use_cache {
            info!("Cache used.");
        } else {
            info!("Cache ignored.");
        }

        let mut failures = 0;
        for &resource in &self.config.resources {
            match self.load_resource(resource).await {
                Ok(records) => display::display(
                    out,
                    resource,
                    &records,
                    &self.config.excluded_extensions,
                    self.config.mode,
                )?,
                Err(e) => {
                    error!(%host, %resource, error = %e, "failed to fetch resource");
                    failures += 1;
                }
            }
        }

        Ok(RunOutcome::Completed { failures })
    }

    /// Returns the records of a resource, from the cache when allowed and fresh
    pub async fn load_resource(&self, resource: Resource) -> Result<Vec<Value>, FetchError> {
        let host = &self.config.host;

        if self.config.use_cache {
            match self.cache.load(host, resource) {
                Ok(records) => {
                    info!(%resource, count = records.len(), "cache hit");
                    return Ok(records);
                }
                Err(miss @ (CacheError::NotFound(_) | CacheError::Expired { .. })) => {
                    debug!(%resource, reason = %miss, "cache miss");
                }
                Err(e) => {
                    warn!(%resource, error = %e, "ignoring unreadable cache entry");
                }
            }
        }

        if resource.is_paginated() {
            self.fetch_paginated(resource).await
        } else {
            self.fetch_single(resource).await
        }
    }

    /// Fetches a single-page resource and replaces its cache entry
    async fn fetch_single(&self, resource: Resource) -> Result<Vec<Value>, FetchError> {
        let host = &self.config.host;
        let body = self
            .client
            .fetch_single(host, resource.endpoint(), &[])
            .await?;

        let records = match body {
            Value::Array(items) => items,
            other => vec![other],
        };

        if let Err(e) = self
            .cache
            .save(host, resource, &records, self.config.ttl_minutes)
        {
            warn!(%resource, error = %e, "failed to write cache");
        }
        Ok(records)
    }

    /// Walks every page of a resource, caching each page as it arrives
    ///
    /// The first page replaces the cache entry and later pages are appended,
    /// so an interrupted walk leaves the pages fetched so far in the cache.
    async fn fetch_paginated(&self, resource: Resource) -> Result<Vec<Value>, FetchError> {
        let host = &self.config.host;
        let ttl = self.config.ttl_minutes;

        let mut query = Vec::new();
        if let Some(mime) = self.config.mime_type.as_deref() {
            query.push(("mime_type", mime));
        }

        let cache = &self.cache;
        let walked = self
            .client
            .fetch_paginated(host, resource.endpoint(), &query, |page, items| {
                let written = if page == 1 {
                    cache.save(host, resource, items, ttl)
                } else {
                    cache.append(host, resource, items, ttl).map(|_| ())
                };
                if let Err(e) = written {
                    warn!(%resource, page, error = %e, "failed to write cache");
                }
            })
            .await;

        match walked {
            Ok(records) => {
                // No page reached the callback, so nothing replaced the old entry
                if records.is_empty() {
                    if let Err(e) = cache.save(host, resource, &[], ttl) {
                        warn!(%resource, error = %e, "failed to write cache");
                    }
                }
                Ok(records)
            }
            Err(e) => {
                // A partial walk must not be served as a complete listing
                if let Err(remove_err) = cache.remove(host, resource) {
                    warn!(%resource, error = %remove_err, "failed to drop partial cache entry");
                }
                Err(e)
            }
        }
    }
}
