//! Cache manager for persisting WordPress responses to disk
//!
//! Provides a `CacheManager` that stores fetched resource arrays as JSON files
//! with an expiration timestamp. Files are named `<host>_<resource>.json` and
//! live in an explicitly configured directory.

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::data::Resource;

/// Directory used when no cache directory is configured
pub const DEFAULT_CACHE_DIR: &str = "cache";

/// Default time-to-live for every resource: 5 hours
pub const DEFAULT_TTL_MINUTES: u64 = 5 * 60;

/// Upper bound on a TTL, roughly ten years
const MAX_TTL_MINUTES: u64 = 10 * 365 * 24 * 60;

/// Reasons a cache lookup can fail
#[derive(Debug, Error)]
pub enum CacheError {
    /// No cache file exists for the host and resource
    #[error("no cache entry at {}", .0.display())]
    NotFound(PathBuf),

    /// The entry exists but its expiration time has passed
    #[error("cache entry expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },

    /// The file is not a valid cache entry
    #[error("malformed cache entry: {0}")]
    Malformed(String),

    /// Reading or writing the cache file failed
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),
}

/// On-disk layout of a cache file
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    /// The cached resource records, in API order
    data: Vec<Value>,
    /// ISO-8601 timestamp after which the entry is stale
    expiration_time: String,
}

/// Manages reading and writing cached resources to disk
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::with_dir(PathBuf::from(DEFAULT_CACHE_DIR))
    }
}

impl CacheManager {
    /// Creates a new CacheManager rooted at `cache_dir`
    ///
    /// The directory does not need to exist yet; it is created on first write.
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Directory this manager reads from and writes to
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path of the cache file for a host and resource
    ///
    /// Path separators and `:` (as in `host:port`) are replaced with `_`.
    pub fn cache_path(&self, host: &str, resource: Resource) -> PathBuf {
        let host = host.replace(['/', '\\', ':'], "_");
        self.cache_dir
            .join(format!("{}_{}.json", host, resource.cache_name()))
    }

    /// Loads the cached records for a host and resource
    ///
    /// # Returns
    /// * `Ok(records)` if the entry exists, parses, and has not expired
    /// * `Err(CacheError::NotFound)` if there is no cache file
    /// * `Err(CacheError::Expired)` if the expiration time has passed
    /// * `Err(CacheError::Malformed)` if the file or its timestamp cannot be parsed
    pub fn load(&self, host: &str, resource: Resource) -> Result<Vec<Value>, CacheError> {
        self.load_at(host, resource, Utc::now())
    }

    /// Same as [`load`](Self::load) with an explicit notion of "now"
    fn load_at(
        &self,
        host: &str,
        resource: Resource,
        now: DateTime<Utc>,
    ) -> Result<Vec<Value>, CacheError> {
        let path = self.cache_path(host, resource);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CacheError::NotFound(path));
            }
            Err(e) => return Err(e.into()),
        };

        let entry: CacheEntry =
            serde_json::from_str(&content).map_err(|e| CacheError::Malformed(e.to_string()))?;
        let expired_at = parse_expiration(&entry.expiration_time).ok_or_else(|| {
            CacheError::Malformed(format!(
                "invalid expiration_time {:?}",
                entry.expiration_time
            ))
        })?;

        if now >= expired_at {
            return Err(CacheError::Expired { expired_at });
        }

        Ok(entry.data)
    }

    /// Writes `data` as the complete entry, replacing whatever was cached
    ///
    /// # Arguments
    /// * `host` - The WordPress host the data came from
    /// * `resource` - Which resource the data belongs to
    /// * `data` - The records to cache
    /// * `ttl_minutes` - How long the entry should be considered fresh
    pub fn save(
        &self,
        host: &str,
        resource: Resource,
        data: &[Value],
        ttl_minutes: u64,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry {
            data: data.to_vec(),
            expiration_time: expiration_from_now(ttl_minutes).to_rfc3339(),
        };
        self.write_entry(&self.cache_path(host, resource), &entry)
    }

    /// Appends `data` to the fresh cached entry and refreshes its expiration
    ///
    /// Any lookup failure (missing, expired, malformed) starts from an empty
    /// entry. Returns the number of records stored after the append.
    pub fn append(
        &self,
        host: &str,
        resource: Resource,
        data: &[Value],
        ttl_minutes: u64,
    ) -> Result<usize, CacheError> {
        let mut records = match self.load(host, resource) {
            Ok(records) => records,
            Err(CacheError::Io(e)) => return Err(CacheError::Io(e)),
            Err(miss) => {
                debug!(%host, resource = %resource, reason = %miss, "appending to empty cache entry");
                Vec::new()
            }
        };
        records.extend_from_slice(data);

        let entry = CacheEntry {
            data: records,
            expiration_time: expiration_from_now(ttl_minutes).to_rfc3339(),
        };
        self.write_entry(&self.cache_path(host, resource), &entry)?;
        Ok(entry.data.len())
    }

    /// Deletes the cache entry for a host and resource, if any
    pub fn remove(&self, host: &str, resource: Resource) -> Result<(), CacheError> {
        match fs::remove_file(self.cache_path(host, resource)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Serializes an entry and writes it atomically via a temp file
    fn write_entry(&self, path: &Path, entry: &CacheEntry) -> Result<(), CacheError> {
        self.ensure_dir()?;

        let json =
            serde_json::to_string(entry).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let temp_path = path.with_extension("json.tmp");
        let written = fs::File::create(&temp_path)
            .and_then(|mut file| {
                file.write_all(json.as_bytes())?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&temp_path, path));
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        debug!(path = %path.display(), records = entry.data.len(), "wrote cache entry");
        Ok(())
    }
}

/// Computes `now + ttl_minutes`, clamping absurd TTLs
fn expiration_from_now(ttl_minutes: u64) -> DateTime<Utc> {
    let minutes = ttl_minutes.min(MAX_TTL_MINUTES) as i64;
    Utc::now() + Duration::minutes(minutes)
}

/// Parses a stored expiration timestamp
///
/// RFC 3339 timestamps are used as-is. Timestamps without an offset are
/// interpreted in local time.
fn parse_expiration(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const HOST: &str = "blog.example.com";

    fn create_test_cache() -> (CacheManager, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = CacheManager::with_dir(temp_dir.path().to_path_buf());
        (cache, temp_dir)
    }

    fn users() -> Vec<Value> {
        vec![
            json!({"id": 1, "name": "admin"}),
            json!({"id": 2, "name": "editor"}),
        ]
    }

    #[test]
    fn test_cache_path_uses_host_and_resource() {
        let cache = CacheManager::with_dir(PathBuf::from("cache"));

        assert_eq!(
            cache.cache_path(HOST, Resource::Users),
            PathBuf::from("cache/blog.example.com_users.json")
        );
        assert_eq!(
            cache.cache_path(HOST, Resource::Files),
            PathBuf::from("cache/blog.example.com_files.json")
        );
    }

    #[test]
    fn test_cache_path_sanitizes_port_and_slashes() {
        let cache = CacheManager::with_dir(PathBuf::from("cache"));

        assert_eq!(
            cache.cache_path("127.0.0.1:8080", Resource::Posts),
            PathBuf::from("cache/127.0.0.1_8080_posts.json")
        );
        assert_eq!(
            cache.cache_path("example.com/blog", Resource::Posts),
            PathBuf::from("cache/example.com_blog_posts.json")
        );
    }

    #[test]
    fn test_default_uses_relative_cache_dir() {
        let cache = CacheManager::default();
        assert_eq!(cache.cache_dir(), Path::new(DEFAULT_CACHE_DIR));
    }

    #[test]
    fn test_load_returns_not_found_for_fresh_host() {
        let (cache, _temp_dir) = create_test_cache();

        let result = cache.load(HOST, Resource::Users);

        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_save_then_load_returns_same_data() {
        let (cache, _temp_dir) = create_test_cache();

        cache
            .save(HOST, Resource::Users, &users(), 60)
            .expect("Save should succeed");

        let loaded = cache.load(HOST, Resource::Users).expect("Should load fresh cache");
        assert_eq!(loaded, users());
    }

    #[test]
    fn test_load_after_expiration_returns_expired() {
        let (cache, _temp_dir) = create_test_cache();
        cache
            .save(HOST, Resource::Users, &users(), 60)
            .expect("Save should succeed");

        let later = Utc::now() + Duration::minutes(61);
        let result = cache.load_at(HOST, Resource::Users, later);

        assert!(matches!(result, Err(CacheError::Expired { .. })));
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let (cache, _temp_dir) = create_test_cache();
        cache
            .save(HOST, Resource::Posts, &users(), 0)
            .expect("Save should succeed");

        let result = cache.load(HOST, Resource::Posts);

        assert!(matches!(result, Err(CacheError::Expired { .. })));
    }

    #[test]
    fn test_repeated_save_replaces_data() {
        let (cache, _temp_dir) = create_test_cache();
        let first = vec![json!({"id": 1})];
        let second = vec![json!({"id": 2})];

        cache.save(HOST, Resource::Posts, &first, 60).unwrap();
        cache.save(HOST, Resource::Posts, &second, 60).unwrap();

        assert_eq!(cache.load(HOST, Resource::Posts).unwrap(), second);
    }

    #[test]
    fn test_repeated_append_accumulates_data() {
        let (cache, _temp_dir) = create_test_cache();

        let count = cache
            .append(HOST, Resource::Files, &[json!({"id": 1})], 60)
            .unwrap();
        assert_eq!(count, 1);
        let count = cache
            .append(HOST, Resource::Files, &[json!({"id": 2}), json!({"id": 3})], 60)
            .unwrap();
        assert_eq!(count, 3);

        let loaded = cache.load(HOST, Resource::Files).unwrap();
        assert_eq!(loaded, vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})]);
    }

    #[test]
    fn test_append_to_expired_entry_starts_fresh() {
        let (cache, _temp_dir) = create_test_cache();
        cache
            .save(HOST, Resource::Files, &[json!({"id": "stale"})], 0)
            .unwrap();

        cache
            .append(HOST, Resource::Files, &[json!({"id": "new"})], 60)
            .unwrap();

        assert_eq!(
            cache.load(HOST, Resource::Files).unwrap(),
            vec![json!({"id": "new"})]
        );
    }

    #[test]
    fn test_malformed_json_is_reported() {
        let (cache, temp_dir) = create_test_cache();
        fs::write(temp_dir.path().join("blog.example.com_users.json"), "{not json").unwrap();

        let result = cache.load(HOST, Resource::Users);

        assert!(matches!(result, Err(CacheError::Malformed(_))));
    }

    #[test]
    fn test_missing_expiration_is_malformed() {
        let (cache, temp_dir) = create_test_cache();
        fs::write(
            temp_dir.path().join("blog.example.com_users.json"),
            r#"{"data": [{"id": 1}]}"#,
        )
        .unwrap();

        let result = cache.load(HOST, Resource::Users);

        assert!(matches!(result, Err(CacheError::Malformed(_))));
    }

    #[test]
    fn test_invalid_expiration_is_malformed() {
        let (cache, temp_dir) = create_test_cache();
        fs::write(
            temp_dir.path().join("blog.example.com_users.json"),
            r#"{"data": [], "expiration_time": ""}"#,
        )
        .unwrap();

        let result = cache.load(HOST, Resource::Users);

        let err = result.unwrap_err();
        assert!(matches!(err, CacheError::Malformed(_)));
        assert!(err.to_string().contains("expiration_time"));
    }

    #[test]
    fn test_file_layout_has_data_and_expiration_time() {
        let (cache, temp_dir) = create_test_cache();
        cache.save(HOST, Resource::Users, &users(), 60).unwrap();

        let content =
            fs::read_to_string(temp_dir.path().join("blog.example.com_users.json")).unwrap();
        let raw: Value = serde_json::from_str(&content).unwrap();

        assert_eq!(raw["data"], json!(users()));
        let expiration = raw["expiration_time"].as_str().expect("expiration_time is a string");
        assert!(DateTime::parse_from_rfc3339(expiration).is_ok());
    }

    #[test]
    fn test_save_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("cache");
        let cache = CacheManager::with_dir(nested_path.clone());

        cache.save(HOST, Resource::Posts, &users(), 60).unwrap();

        assert!(nested_path.join("blog.example.com_posts.json").exists());
        assert!(!nested_path.join("blog.example.com_posts.json.tmp").exists());
    }

    #[test]
    fn test_failed_write_leaves_no_temp_file() {
        let (cache, temp_dir) = create_test_cache();
        // A non-empty directory at the entry path makes the final rename fail
        let entry_path = temp_dir.path().join("blog.example.com_users.json");
        fs::create_dir(&entry_path).unwrap();
        fs::write(entry_path.join("keep"), "x").unwrap();

        let result = cache.save(HOST, Resource::Users, &users(), 60);

        assert!(matches!(result, Err(CacheError::Io(_))));
        assert!(!temp_dir.path().join("blog.example.com_users.json.tmp").exists());
    }

    #[test]
    fn test_remove_deletes_entry_and_tolerates_missing() {
        let (cache, _temp_dir) = create_test_cache();
        cache.save(HOST, Resource::Users, &users(), 60).unwrap();

        cache.remove(HOST, Resource::Users).unwrap();
        assert!(matches!(
            cache.load(HOST, Resource::Users),
            Err(CacheError::NotFound(_))
        ));

        cache.remove(HOST, Resource::Users).expect("Removing twice is fine");
    }

    #[test]
    fn test_parse_expiration_accepts_rfc3339() {
        let parsed = parse_expiration("2030-01-02T03:04:05+00:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap());
    }

    #[test]
    fn test_parse_expiration_accepts_naive_local_timestamps() {
        let with_micros = parse_expiration("2030-01-02T03:04:05.123456").unwrap();
        let without_micros = parse_expiration("2030-01-02T03:04:05").unwrap();

        let expected = Local
            .with_ymd_and_hms(2030, 1, 2, 3, 4, 5)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(without_micros, expected);
        assert!(with_micros > without_micros);
    }

    #[test]
    fn test_parse_expiration_rejects_garbage() {
        assert!(parse_expiration("").is_none());
        assert!(parse_expiration("tomorrow").is_none());
    }

    #[test]
    fn test_entry_written_by_older_tool_is_readable() {
        let (cache, temp_dir) = create_test_cache();
        let future = (Local::now() + Duration::hours(1))
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();
        fs::write(
            temp_dir.path().join("blog.example.com_posts.json"),
            format!(r#"{{"data": [{{"id": 7}}], "expiration_time": "{}"}}"#, future),
        )
        .unwrap();

        let loaded = cache.load(HOST, Resource::Posts).unwrap();

        assert_eq!(loaded, vec![json!({"id": 7})]);
    }
}
