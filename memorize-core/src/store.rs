use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache_file::{self, CacheFile};
use crate::config::{self, CacheLocation};
use crate::error::Result;
use crate::slug;
#[cfg(feature = "stats")]
use crate::stats::CacheStats;

// In-memory state after the one-time disk load.
struct Loaded<R> {
    path: PathBuf,
    entries: HashMap<String, R>,
}

/// Disk-persisted result store for one memoized function.
///
/// A `PersistentCache` binds a function identity - the source file that
/// defines it plus its declared name - to an on-disk cache file named
/// `{slug(source stem)}_{slug(name)}.cache`. Results accumulate in memory
/// and the whole file is rewritten synchronously after every miss, so a
/// later process execution can reuse them.
///
/// # Lifecycle
///
/// * The cache file is read **at most once** per store lifetime, lazily on
///   first use, so the [`CacheLocation`](crate::CacheLocation) switch can
///   still be flipped after construction.
/// * At load, the persisted `timestamp` is validated against the source
///   file's live modification time. If the source has been modified since
///   the cache was written, the entire cache is silently discarded and the
///   store starts empty; the invalidated file is simply overwritten on the
///   next write.
/// * Every insert restamps the file with a freshly read source mtime.
///
/// # Single-writer constraint
///
/// A store exclusively owns its in-memory map and is assumed to be the sole
/// writer of its file for the lifetime of a program run. Concurrent
/// processes memoizing the same function against the same path are
/// **unsupported**: writes race and the last writer wins. There is
/// deliberately no locking, versioning, or merge strategy.
///
/// # Examples
///
/// ```no_run
/// use memorize_core::PersistentCache;
///
/// let mut store: PersistentCache<u64> =
///     PersistentCache::new("src/pricing.rs", "lookup_rate");
///
/// if store.get("eur|usd").is_none() {
///     let rate = 109u64; // expensive computation stands in here
///     store.insert("eur|usd", rate);
/// }
/// ```
pub struct PersistentCache<R> {
    source_path: PathBuf,
    file_name: String,
    location: Option<CacheLocation>,
    loaded: Option<Loaded<R>>,
    #[cfg(feature = "stats")]
    stats: CacheStats,
}

impl<R> PersistentCache<R> {
    /// Binds a store to the source file defining the memoized function and
    /// the function's declared name. No I/O happens until the first lookup
    /// or insert.
    pub fn new(source_path: impl Into<PathBuf>, function_name: &str) -> Self {
        let source_path = source_path.into();
        let file_name = slug::cache_file_name(&source_path, function_name);
        Self {
            source_path,
            file_name,
            location: None,
            loaded: None,
            #[cfg(feature = "stats")]
            stats: CacheStats::new(),
        }
    }

    /// Builds a store from the `env!("CARGO_MANIFEST_DIR")` / `file!()`
    /// pair that the `#[memorize]` macro expands in the caller's crate.
    ///
    /// `file!()` paths are compilation-relative; an existing
    /// `manifest_dir`-joined path is preferred, falling back to the literal
    /// path (which covers workspace-root-relative paths when the process
    /// runs from the workspace root).
    pub fn resolve(manifest_dir: &str, source_file: &str, function_name: &str) -> Self {
        let candidate = Path::new(source_file);
        let source_path = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            let joined = Path::new(manifest_dir).join(candidate);
            if joined.exists() {
                joined
            } else {
                candidate.to_path_buf()
            }
        };
        Self::new(source_path, function_name)
    }

    /// Overrides the process-wide [`CacheLocation`] for this store only.
    pub fn with_location(mut self, location: CacheLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// The slug-derived file name this store persists to, e.g.
    /// `pricing_lookup_rate.cache`.
    pub fn cache_file_name(&self) -> &str {
        &self.file_name
    }

    /// Absolute path of the source file this store validates against.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Hit/miss counters for this store.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl<R: Clone + Serialize + DeserializeOwned> PersistentCache<R> {
    /// Looks up a previously computed result.
    ///
    /// The first call loads and validates the cache file; a missing file or
    /// a stale timestamp both start the store empty. Returns
    /// [`CacheError`](crate::CacheError) if the cache file exists but cannot
    /// be read or parsed, or if the source file cannot be stat'd while a
    /// cache is present.
    pub fn try_get(&mut self, key: &str) -> Result<Option<R>> {
        self.ensure_loaded()?;
        let value = self.state().entries.get(key).cloned();

        #[cfg(feature = "stats")]
        if value.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }

        Ok(value)
    }

    /// Stores a computed result and synchronously rewrites the cache file,
    /// stamped with the source file's current modification time.
    pub fn try_insert(&mut self, key: &str, value: R) -> Result<()> {
        self.ensure_loaded()?;
        let timestamp = cache_file::source_mtime(&self.source_path)?;

        let loaded = self.state();
        loaded.entries.insert(key.to_string(), value);
        cache_file::write(&loaded.path, timestamp, &loaded.entries)
    }

    /// Infallible lookup for signature-preserving call sites.
    ///
    /// # Panics
    ///
    /// Panics on a cache I/O or deserialization failure. A corrupt or
    /// inaccessible cache file is fatal at call time; use
    /// [`try_get`](PersistentCache::try_get) to handle the error instead.
    pub fn get(&mut self, key: &str) -> Option<R> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => panic!("memorize: failed to read cache `{}`: {e}", self.file_name),
        }
    }

    /// Infallible insert for signature-preserving call sites.
    ///
    /// # Panics
    ///
    /// Panics on a cache I/O or serialization failure, like
    /// [`get`](PersistentCache::get).
    pub fn insert(&mut self, key: &str, value: R) {
        if let Err(e) = self.try_insert(key, value) {
            panic!("memorize: failed to write cache `{}`: {e}", self.file_name);
        }
    }

    fn ensure_loaded(&mut self) -> Result<()> {
        if self.loaded.is_some() {
            return Ok(());
        }

        let dir = match self.location.unwrap_or_else(config::cache_location) {
            CacheLocation::CurrentDir => std::env::current_dir()?,
            CacheLocation::SourceDir => self
                .source_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        let path = dir.join(&self.file_name);

        let entries = match CacheFile::load(&path)? {
            Some(file) if file.is_safe(cache_file::source_mtime(&self.source_path)?) => file.cache,
            // Stale or absent: start from an empty mapping. The old file,
            // if any, gets overwritten on the next write.
            _ => HashMap::new(),
        };

        self.loaded = Some(Loaded { path, entries });
        Ok(())
    }

    fn state(&mut self) -> &mut Loaded<R> {
        match self.loaded.as_mut() {
            Some(loaded) => loaded,
            None => unreachable!("state() called before ensure_loaded()"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use serial_test::serial;
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn write_source(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, "fn body() {}").unwrap();
        path
    }

    fn bump_mtime(path: &Path, ahead: Duration) {
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + ahead).unwrap();
    }

    #[test]
    fn test_cache_file_name_is_slug_derived() {
        let store: PersistentCache<u32> =
            PersistentCache::new("/tmp/data pipeline.rs", "load_all");
        assert_eq!(store.cache_file_name(), "data-pipeline_load_all.cache");
    }

    #[test]
    fn test_cold_store_misses_then_hits() {
        let dir = TempDir::new().unwrap();
        let src = write_source(&dir, "calc.rs");

        let mut store: PersistentCache<u32> =
            PersistentCache::new(&src, "double").with_location(CacheLocation::SourceDir);

        assert_eq!(store.try_get("2").unwrap(), None);
        store.try_insert("2", 4).unwrap();
        assert_eq!(store.try_get("2").unwrap(), Some(4));
    }

    #[test]
    fn test_results_survive_a_fresh_store() {
        let dir = TempDir::new().unwrap();
        let src = write_source(&dir, "calc.rs");

        let mut first: PersistentCache<u32> =
            PersistentCache::new(&src, "double").with_location(CacheLocation::SourceDir);
        first.try_insert("21", 42).unwrap();
        drop(first);

        // A fresh store over the same source stands in for a new process
        // execution.
        let mut second: PersistentCache<u32> =
            PersistentCache::new(&src, "double").with_location(CacheLocation::SourceDir);
        assert_eq!(second.try_get("21").unwrap(), Some(42));
    }

    #[test]
    fn test_modified_source_discards_whole_cache() {
        let dir = TempDir::new().unwrap();
        let src = write_source(&dir, "calc.rs");

        let mut first: PersistentCache<u32> =
            PersistentCache::new(&src, "double").with_location(CacheLocation::SourceDir);
        first.try_insert("1", 2).unwrap();
        first.try_insert("2", 4).unwrap();
        drop(first);

        bump_mtime(&src, Duration::from_secs(10));

        let mut second: PersistentCache<u32> =
            PersistentCache::new(&src, "double").with_location(CacheLocation::SourceDir);
        assert_eq!(second.try_get("1").unwrap(), None);
        assert_eq!(second.try_get("2").unwrap(), None);

        // Recomputed values overwrite the stale file.
        second.try_insert("1", 3).unwrap();
        drop(second);

        let mut third: PersistentCache<u32> =
            PersistentCache::new(&src, "double").with_location(CacheLocation::SourceDir);
        assert_eq!(third.try_get("1").unwrap(), Some(3));
    }

    #[test]
    fn test_cache_loads_at_most_once_per_store() {
        let dir = TempDir::new().unwrap();
        let src = write_source(&dir, "calc.rs");

        let mut store: PersistentCache<u32> =
            PersistentCache::new(&src, "double").with_location(CacheLocation::SourceDir);
        store.try_insert("1", 2).unwrap();

        // Deleting the file after the load must not affect lookups; the
        // store owns its in-memory mapping for its whole lifetime.
        let cache_path = dir.path().join(store.cache_file_name());
        fs::remove_file(&cache_path).unwrap();
        assert_eq!(store.try_get("1").unwrap(), Some(2));
    }

    #[test]
    fn test_unreadable_source_with_existing_cache_is_fatal() {
        let dir = TempDir::new().unwrap();
        let src = write_source(&dir, "calc.rs");

        let mut store: PersistentCache<u32> =
            PersistentCache::new(&src, "double").with_location(CacheLocation::SourceDir);
        store.try_insert("1", 2).unwrap();
        drop(store);

        fs::remove_file(&src).unwrap();

        let mut second: PersistentCache<u32> =
            PersistentCache::new(&src, "double").with_location(CacheLocation::SourceDir);
        assert!(matches!(
            second.try_get("1"),
            Err(CacheError::SourceMetadata { .. })
        ));
    }

    #[test]
    fn test_corrupt_cache_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let src = write_source(&dir, "calc.rs");

        let mut store: PersistentCache<u32> =
            PersistentCache::new(&src, "double").with_location(CacheLocation::SourceDir);
        fs::write(dir.path().join(store.cache_file_name()), "garbage").unwrap();

        assert!(matches!(
            store.try_get("1"),
            Err(CacheError::Serialization(_))
        ));
    }

    #[test]
    #[should_panic(expected = "failed to read cache")]
    fn test_infallible_get_panics_on_corrupt_cache() {
        let dir = TempDir::new().unwrap();
        let src = write_source(&dir, "calc.rs");

        let mut store: PersistentCache<u32> =
            PersistentCache::new(&src, "double").with_location(CacheLocation::SourceDir);
        fs::write(dir.path().join(store.cache_file_name()), "garbage").unwrap();

        let _ = store.get("1");
    }

    #[test]
    #[serial]
    fn test_global_location_switch_places_file_beside_source() {
        let dir = TempDir::new().unwrap();
        let src = write_source(&dir, "calc.rs");

        config::set_cache_location(CacheLocation::SourceDir);
        let mut store: PersistentCache<u32> = PersistentCache::new(&src, "double");
        store.try_insert("1", 2).unwrap();
        config::set_cache_location(CacheLocation::CurrentDir);

        assert!(dir.path().join(store.cache_file_name()).exists());
    }

    #[test]
    #[serial]
    fn test_current_dir_location_places_file_in_cwd() {
        let dir = TempDir::new().unwrap();
        let src = write_source(&dir, "calc.rs");

        let prev = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let mut store: PersistentCache<u32> =
            PersistentCache::new(&src, "double").with_location(CacheLocation::CurrentDir);
        store.try_insert("1", 2).unwrap();
        let file_name = store.cache_file_name().to_string();
        drop(store);

        std::env::set_current_dir(prev).unwrap();
        assert!(dir.path().join(file_name).exists());
    }

    #[test]
    fn test_resolve_prefers_manifest_relative_path() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        let src = dir.path().join("src/lib.rs");
        fs::write(&src, "fn body() {}").unwrap();

        let store: PersistentCache<u32> =
            PersistentCache::resolve(&dir.path().to_string_lossy(), "src/lib.rs", "double");
        assert_eq!(store.source_path(), src.as_path());
    }

    #[cfg(feature = "stats")]
    #[test]
    fn test_stats_track_hits_and_misses() {
        let dir = TempDir::new().unwrap();
        let src = write_source(&dir, "calc.rs");

        let mut store: PersistentCache<u32> =
            PersistentCache::new(&src, "double").with_location(CacheLocation::SourceDir);

        assert_eq!(store.try_get("1").unwrap(), None);
        store.try_insert("1", 2).unwrap();
        assert_eq!(store.try_get("1").unwrap(), Some(2));
        assert_eq!(store.try_get("1").unwrap(), Some(2));

        assert_eq!(store.stats().misses(), 1);
        assert_eq!(store.stats().hits(), 2);
    }
}
