//! WordPress resources and the REST client that fetches them
//!
//! Records are kept as raw `serde_json::Value`s exactly as the API returned
//! them; nothing here validates their shape.

pub mod client;

pub use client::{FetchError, WpClient, MAX_PAGES, WP_NAMESPACE};

use std::fmt;

/// One of the WordPress entity types the tool can list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Registered users (`wp/v2/users`)
    Users,
    /// Media library entries (`wp/v2/media`)
    Files,
    /// Published posts (`wp/v2/posts`)
    Posts,
}

impl Resource {
    /// Every resource, in the order they are processed
    pub const ALL: [Resource; 3] = [Resource::Users, Resource::Files, Resource::Posts];

    /// REST endpoint relative to `wp-json/`
    pub fn endpoint(self) -> &'static str {
        match self {
            Resource::Users => "wp/v2/users",
            Resource::Files => "wp/v2/media",
            Resource::Posts => "wp/v2/posts",
        }
    }

    /// Name used in cache file names
    pub fn cache_name(self) -> &'static str {
        match self {
            Resource::Users => "users",
            Resource::Files => "files",
            Resource::Posts => "posts",
        }
    }

    /// Whether the resource is walked page by page
    ///
    /// Users and posts are read from the first page only.
    pub fn is_paginated(self) -> bool {
        matches!(self, Resource::Files)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cache_name())
    }
}
