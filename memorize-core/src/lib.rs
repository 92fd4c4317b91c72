//! # Memorize Core
//!
//! Core functionality for the Memorize memoization library: a cache that
//! survives separate program executions.
//!
//! A memoized function persists its results to a `.cache` file, one file
//! per (source file, function name) pair. The next execution reuses those
//! results - unless the source file containing the function has been
//! modified since the cache was written, in which case the whole cache is
//! discarded and rebuilt (the function's behavior may have changed).
//!
//! ## Module Organization
//!
//! - [`cache_file`] - the persisted record: source timestamp + result map
//! - [`store`] - [`PersistentCache`], lazy load, validation, synchronous writes
//! - [`memoized`] - [`Memoized`], the explicit call-intercepting wrapper
//! - [`keys`] - fallible cache-key generation ([`CacheableKey`])
//! - [`slug`] - filesystem-safe cache file naming
//! - [`config`] - process-wide [`CacheLocation`] switch
//! - [`error`] - [`CacheError`] for fatal cache I/O conditions
//!
//! ## Caveats
//!
//! Only memoize **pure** functions. Ask yourself: does the function alter
//! shared state? Does its result depend on anything outside its arguments
//! (the clock, the network, the filesystem)? Do you need its side effects
//! to run every time? If so, do not memoize it.
//!
//! Running multiple processes that memoize the same function against the
//! same cache path is unsupported: writes race and the last writer wins.

mod cache_file;
mod config;
mod error;
mod keys;
mod memoized;
mod store;

pub mod slug;

#[cfg(feature = "stats")]
mod stats;

pub use cache_file::{source_mtime, CacheFile};
pub use config::{cache_location, set_cache_location, CacheLocation};
pub use error::{CacheError, Result};
pub use keys::{CacheableKey, DefaultCacheableKey};
pub use memoized::Memoized;
pub use store::PersistentCache;

#[cfg(feature = "stats")]
pub use stats::CacheStats;
