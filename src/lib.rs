//! # Memorize
//!
//! Transparent memoization of pure functions *across program executions*.
//!
//! A function decorated with `#[memorize]` caches its return value every
//! time it is called. If the function is called later with the same
//! arguments - in this execution or a future one - the cached value is
//! returned and the function is not reevaluated. The cache is stored as a
//! `.cache` file (in the current directory by default) for reuse in future
//! executions. If the source file containing the memoized function has been
//! modified since the last run, the cache is discarded and rebuilt, in case
//! the behavior of the function has changed.
//!
//! ## Quick Start
//!
//! ```ignore
//! use memorize::memorize;
//!
//! #[memorize]
//! fn fibonacci(n: u32) -> u64 {
//!     if n <= 1 {
//!         return n as u64;
//!     }
//!     fibonacci(n - 1) + fibonacci(n - 2)
//! }
//!
//! // First run computes; every later run of the program answers from disk.
//! let result = fibonacci(40);
//! ```
//!
//! ## Beware: only memoize pure functions
//!
//! Ask yourself:
//!
//! - does your function alter shared or global state?
//! - do you need its side effects (logging, printing) to run every time?
//! - does the result depend on something outside the arguments that may
//!   have changed, such as the clock, the filesystem, or a network service?
//!
//! If any answer is yes, do not memoize the function: a warm cache will
//! happily return results computed under conditions that no longer hold.
//!
//! ## Cache placement
//!
//! By default cache files land in the process's current working directory.
//! Call [`set_cache_location`]`(CacheLocation::SourceDir)` before the first
//! invocation of any memoized function to store caches beside the defining
//! source files instead, or override per function with
//! `#[memorize(location = "source_dir")]`.
//!
//! ## Unkeyable arguments
//!
//! Cache keys are built from the ordered tuple of arguments via the
//! fallible [`CacheableKey`] probe. An argument without a stable key - a
//! `Vec`, or anything with interior mutability - makes the call silently
//! bypass the cache: the function runs, nothing is stored, and no error is
//! raised.
//!
//! ## Result-returning functions
//!
//! Functions returning `Result<T, E>` cache only `Ok` values; a failed call
//! is never cached and the error propagates unchanged:
//!
//! ```ignore
//! use memorize::memorize;
//!
//! #[memorize]
//! fn divide(a: i32, b: i32) -> Result<i32, String> {
//!     if b == 0 {
//!         Err("Division by zero".to_string())
//!     } else {
//!         Ok(a / b)
//!     }
//! }
//! ```
//!
//! ## Concurrency
//!
//! DO NOT run multiple processes that memoize the same function against the
//! same cache path. There is no cross-process coordination: writes race and
//! the last writer wins. Within a process, macro-generated caches live in
//! thread-local storage, so each thread keeps its own store.

pub use memorize_core::*;
pub use memorize_macros::memorize;
