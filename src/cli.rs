//! Command-line interface parsing for wpprobe
//!
//! This module handles parsing of CLI arguments using clap and turns them
//! into an [`AppConfig`], the single configuration value the rest of the
//! program is driven by.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::cache::{DEFAULT_CACHE_DIR, DEFAULT_TTL_MINUTES};
use crate::data::Resource;
use crate::display::OutputMode;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// The host argument is empty or not a plain host name
    #[error("Invalid host: '{0}'. Expected a host name such as example.com")]
    InvalidHost(String),

    /// The host was given with `http://`, but requests are always HTTPS
    #[error("Unsupported scheme in '{0}': wpprobe only speaks HTTPS, pass the bare host name")]
    InsecureScheme(String),
}

/// WordPress API explorer
#[derive(Parser, Debug)]
#[command(name = "wpprobe")]
#[command(about = "WordPress API explorer: list users, media files and posts of a site")]
#[command(version)]
pub struct Cli {
    /// WordPress host name (an https:// prefix is accepted; requests always use HTTPS)
    pub host: String,

    /// Get all users
    #[arg(short, long)]
    pub users: bool,

    /// Get all files
    #[arg(short, long)]
    pub files: bool,

    /// Get all posts
    #[arg(short, long)]
    pub posts: bool,

    /// Detect if the WP API is available for querying, then exit
    #[arg(long)]
    pub detect_only: bool,

    /// Ignore the cache and make a fresh request
    #[arg(long)]
    pub nocache: bool,

    /// Display output in a human-readable format
    #[arg(long)]
    pub human_readable: bool,

    /// Exclude files with the specified extensions (comma-separated, case-sensitive)
    #[arg(long, value_name = "EXTS", value_delimiter = ',')]
    pub exclude_file: Vec<String>,

    /// Include only files of the specified mime type (e.g. application/sql)
    #[arg(long, value_name = "TYPE")]
    pub mimetype: Option<String>,

    /// Show verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory holding cached responses
    #[arg(long, value_name = "DIR", default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,

    /// Minutes a cached response stays fresh
    #[arg(long, value_name = "MINUTES", default_value_t = DEFAULT_TTL_MINUTES)]
    pub ttl_minutes: u64,

    /// Give up on a request after this many seconds (no limit by default)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to query, without scheme or trailing slash
    pub host: String,
    /// Resources to list, in processing order
    pub resources: Vec<Resource>,
    /// Stop after detection
    pub detect_only: bool,
    /// Whether cached responses may be used
    pub use_cache: bool,
    /// Output format
    pub mode: OutputMode,
    /// File extensions hidden from media listings
    pub excluded_extensions: Vec<String>,
    /// Mime type filter for media listings
    pub mime_type: Option<String>,
    /// Directory holding cached responses
    pub cache_dir: PathBuf,
    /// Minutes a cached response stays fresh
    pub ttl_minutes: u64,
    /// Per-request timeout
    pub timeout: Option<Duration>,
    /// Verbose logging
    pub verbose: bool,
}

impl AppConfig {
    /// Creates an AppConfig for `host` with every option at its default
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            resources: Vec::new(),
            detect_only: false,
            use_cache: true,
            mode: OutputMode::Json,
            excluded_extensions: Vec::new(),
            mime_type: None,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            ttl_minutes: DEFAULT_TTL_MINUTES,
            timeout: None,
            verbose: false,
        }
    }

    /// Creates an AppConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(AppConfig)` with the selected resources and options
    /// * `Err(CliError)` if the host is not usable
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let host = normalize_host(&cli.host)?;

        let resources = Resource::ALL
            .into_iter()
            .filter(|resource| match resource {
                Resource::Users => cli.users,
                Resource::Files => cli.files,
                Resource::Posts => cli.posts,
            })
            .collect();

        let excluded_extensions = cli
            .exclude_file
            .iter()
            .map(|ext| ext.trim())
            .filter(|ext| !ext.is_empty())
            .map(str::to_string)
            .collect();

        Ok(AppConfig {
            host,
            resources,
            detect_only: cli.detect_only,
            use_cache: !cli.nocache,
            mode: if cli.human_readable {
                OutputMode::Human
            } else {
                OutputMode::Json
            },
            excluded_extensions,
            mime_type: cli.mimetype.clone().filter(|m| !m.trim().is_empty()),
            cache_dir: cli.cache_dir.clone(),
            ttl_minutes: cli.ttl_minutes,
            timeout: cli.timeout.map(Duration::from_secs),
            verbose: cli.verbose,
        })
    }
}

/// Strips an `https://` prefix and trailing slashes from a host argument
///
/// An `http://` prefix is rejected rather than silently upgraded.
pub fn normalize_host(raw: &str) -> Result<String, CliError> {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") {
        return Err(CliError::InsecureScheme(raw.to_string()));
    }
    let without_scheme = trimmed.strip_prefix("https://").unwrap_or(trimmed);
    let host = without_scheme.trim_end_matches('/');

    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return Err(CliError::InvalidHost(raw.to_string()));
    }
    Ok(host.to_string())
}
