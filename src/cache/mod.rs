//! Cache module for storing API responses to disk
//!
//! This module provides a cache manager that persists fetched WordPress
//! resources as JSON files, one per (host, resource) pair, each carrying an
//! expiration timestamp. Lookups report why they missed (not found, expired,
//! malformed) instead of silently returning nothing.

mod manager;

pub use manager::{CacheError, CacheManager, DEFAULT_CACHE_DIR, DEFAULT_TTL_MINUTES};
