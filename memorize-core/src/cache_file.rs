use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::UNIX_EPOCH;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// The persisted unit: one cache file per (source file, function name) pair.
///
/// A `CacheFile` holds exactly two fields:
///
/// * `timestamp` - the modification time of the source file containing the
///   memoized function, in floating-point seconds since the epoch, captured
///   at the moment the cache was last written.
/// * `cache` - every result accumulated for that function, keyed by the
///   string derived from its argument tuple.
///
/// Validity is all-or-nothing: the file is safe to reuse if and only if the
/// source file's current modification time is not greater than `timestamp`.
/// A stale file is discarded wholesale and replaced by an empty mapping;
/// entries are never merged or partially invalidated.
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheFile<R> {
    pub timestamp: f64,
    pub cache: HashMap<String, R>,
}

// Serialization view that borrows the live map, so a synchronous rewrite
// after every miss does not clone the whole cache.
#[derive(Serialize)]
struct CacheFileRef<'a, R> {
    timestamp: f64,
    cache: &'a HashMap<String, R>,
}

impl<R> CacheFile<R> {
    /// Returns whether the persisted cache is still trustworthy given the
    /// source file's current modification time.
    ///
    /// # Examples
    ///
    /// ```
    /// use memorize_core::CacheFile;
    /// use std::collections::HashMap;
    ///
    /// let file: CacheFile<i32> = CacheFile { timestamp: 100.0, cache: HashMap::new() };
    /// assert!(file.is_safe(100.0));
    /// assert!(file.is_safe(99.5));
    /// assert!(!file.is_safe(100.5));
    /// ```
    pub fn is_safe(&self, source_mtime: f64) -> bool {
        source_mtime <= self.timestamp
    }
}

impl<R: DeserializeOwned> CacheFile<R> {
    /// Reads a cache file from disk.
    ///
    /// Returns `Ok(None)` if no file exists at `path` (a cold cache is not
    /// an error). A file that exists but cannot be read or parsed is an
    /// error: a half-read structure cannot be trusted, so there is no
    /// partial recovery.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)?;
        let file = serde_json::from_str(&contents)?;
        Ok(Some(file))
    }
}

/// Writes a cache file to disk, replacing any previous version.
///
/// The write goes through a temporary sibling file followed by a rename, so
/// a reader never observes a torn file. Note this protects against a crash
/// mid-write, not against concurrent writers: two processes persisting the
/// same path still race, last writer wins.
pub fn write<R: Serialize>(
    path: &Path,
    timestamp: f64,
    cache: &HashMap<String, R>,
) -> Result<()> {
    let json = serde_json::to_string(&CacheFileRef { timestamp, cache })?;

    let temp_path = path.with_extension("cache.tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Reads a source file's modification time as floating-point seconds since
/// the epoch, matching the platform's mtime resolution.
pub fn source_mtime(path: &Path) -> Result<f64> {
    let stat = |p: &Path| -> std::io::Result<f64> {
        let modified = fs::metadata(p)?.modified()?;
        let since_epoch = modified
            .duration_since(UNIX_EPOCH)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        Ok(since_epoch.as_secs_f64())
    };

    stat(path).map_err(|source| CacheError::SourceMetadata {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo_fn.cache");

        let mut cache = HashMap::new();
        cache.insert("1".to_string(), 2i64);
        cache.insert("2".to_string(), 4i64);

        write(&path, 1234.5, &cache).unwrap();

        let loaded: CacheFile<i64> = CacheFile::load(&path).unwrap().unwrap();
        assert_eq!(loaded.timestamp, 1234.5);
        assert_eq!(loaded.cache, cache);
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.cache");

        let loaded: Option<CacheFile<i64>> = CacheFile::load(&path).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_corrupt_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbled.cache");
        fs::write(&path, "not json at all").unwrap();

        let result: Result<Option<CacheFile<i64>>> = CacheFile::load(&path);
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_rewrite_replaces_previous_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo_fn.cache");

        let mut cache = HashMap::new();
        cache.insert("k".to_string(), 1i64);
        write(&path, 10.0, &cache).unwrap();

        cache.insert("k".to_string(), 2i64);
        write(&path, 20.0, &cache).unwrap();

        let loaded: CacheFile<i64> = CacheFile::load(&path).unwrap().unwrap();
        assert_eq!(loaded.timestamp, 20.0);
        assert_eq!(loaded.cache.get("k"), Some(&2));
    }

    #[test]
    fn test_staleness_boundary_is_strictly_greater() {
        let file: CacheFile<i32> = CacheFile {
            timestamp: 50.0,
            cache: HashMap::new(),
        };
        // Equal mtime means the source has not changed since the write.
        assert!(file.is_safe(50.0));
        assert!(!file.is_safe(50.000001));
    }

    #[test]
    fn test_source_mtime_matches_filesystem() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("probe.rs");
        fs::write(&src, "fn probe() {}").unwrap();

        let mtime = source_mtime(&src).unwrap();
        assert!(mtime > 0.0);
        // Re-reading without modification yields the same stamp.
        assert_eq!(mtime, source_mtime(&src).unwrap());
    }

    #[test]
    fn test_source_mtime_of_missing_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone.rs");

        assert!(matches!(
            source_mtime(&missing),
            Err(CacheError::SourceMetadata { .. })
        ));
    }
}
