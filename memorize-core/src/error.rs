use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing a cache file.
///
/// Cache I/O is deliberately unforgiving: a cache file that cannot be read,
/// parsed, or rewritten is treated as fatal at call time. A half-read cache
/// cannot be trusted, so there is no retry and no partial-cache recovery.
///
/// Note that neither a *missing* cache file nor a *stale* one is an error:
/// both simply start the store with an empty map.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The source file containing the memoized function could not be stat'd.
    /// Without its modification time the cache cannot be validated or stamped.
    #[error("cannot read modification time of source file {path}: {source}")]
    SourceMetadata {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CacheError>;
