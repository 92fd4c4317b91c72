use once_cell::sync::Lazy;
use parking_lot::RwLock;

/// Where a cache file is placed on disk.
///
/// # Variants
///
/// * `CurrentDir` - beside the process's current working directory (the
///   default). Useful when one program is run from a stable location.
/// * `SourceDir` - beside the source file that contains the memoized
///   function. Useful when the same function is invoked from varying
///   working directories and should share one cache.
///
/// The placement is resolved lazily, at a store's first load, so the
/// process-wide switch can be flipped any time before the first invocation
/// of a wrapped function.
///
/// # Examples
///
/// ```
/// use memorize_core::CacheLocation;
///
/// let location = CacheLocation::CurrentDir;
/// assert_eq!(location, CacheLocation::default());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheLocation {
    #[default]
    CurrentDir,
    SourceDir,
}

static CACHE_LOCATION: Lazy<RwLock<CacheLocation>> =
    Lazy::new(|| RwLock::new(CacheLocation::CurrentDir));

/// Sets the process-wide cache placement.
///
/// Affects every store that has not yet performed its first load. Stores
/// that have already loaded keep the placement they resolved; set the
/// location before the first invocation of any wrapped function. Individual
/// wrappers can override the global switch with their own
/// `with_location` / `location = "..."` setting.
pub fn set_cache_location(location: CacheLocation) {
    *CACHE_LOCATION.write() = location;
}

/// Returns the current process-wide cache placement.
pub fn cache_location() -> CacheLocation {
    *CACHE_LOCATION.read()
}
