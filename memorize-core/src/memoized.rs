use std::fmt;
use std::marker::PhantomData;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::CacheLocation;
use crate::error::Result;
use crate::keys::CacheableKey;
use crate::store::PersistentCache;
#[cfg(feature = "stats")]
use crate::stats::CacheStats;

/// Explicit memoizing wrapper around a single function value.
///
/// `Memoized` is the programmatic form of the `#[memorize]` attribute: it
/// takes exactly one function, binds it to a stable identity (the defining
/// source file plus a name), and intercepts every call. Arguments in, the
/// same logical result out; the only side effects are a possible disk read
/// on the first call, a disk write on every miss, and an invocation of the
/// wrapped function on every miss (or on every call whose arguments cannot
/// be keyed).
///
/// Only **pure** functions should be memoized. If the function mutates
/// shared state, depends on anything outside its arguments, or needs its
/// side effects re-run, a warm cache will give surprising answers.
///
/// # Instance methods
///
/// The receiver is an explicit leading element of the argument tuple, so it
/// participates in the cache key like any other argument: wrap a closure
/// taking `&(Receiver, Args...)`. Distinct-by-key receivers get distinct
/// entries; receivers that key identically intentionally share entries.
///
/// # Examples
///
/// ```no_run
/// use memorize_core::Memoized;
///
/// let mut double = Memoized::new(|n: &u64| n * 2, "src/math.rs", "double")
///     .with_doc("Doubles a number, expensively.");
///
/// assert_eq!(double.call(21), 42);
/// // Second call with the same argument is answered from the cache.
/// assert_eq!(double.call(21), 42);
/// assert_eq!(double.doc(), Some("Doubles a number, expensively."));
/// ```
pub struct Memoized<F, A, R> {
    func: F,
    store: PersistentCache<R>,
    doc: Option<&'static str>,
    _call: PhantomData<fn(A) -> R>,
}

impl<F, A, R> Memoized<F, A, R>
where
    F: FnMut(&A) -> R,
    A: CacheableKey,
    R: Clone + Serialize + DeserializeOwned,
{
    /// Wraps `func`, binding it to the source file that defines it and the
    /// name it is declared under. No I/O happens until the first call.
    pub fn new(func: F, source_path: impl Into<PathBuf>, name: &str) -> Self {
        Self {
            func,
            store: PersistentCache::new(source_path, name),
            doc: None,
            _call: PhantomData,
        }
    }

    /// Overrides the process-wide [`CacheLocation`] for this wrapper only.
    pub fn with_location(mut self, location: CacheLocation) -> Self {
        self.store = self.store.with_location(location);
        self
    }

    /// Attaches the wrapped function's documentation string, retrievable
    /// through [`doc`](Memoized::doc) and the `Display` impl.
    pub fn with_doc(mut self, doc: &'static str) -> Self {
        self.doc = Some(doc);
        self
    }

    /// The wrapped function's documentation string, if one was attached.
    pub fn doc(&self) -> Option<&'static str> {
        self.doc
    }

    /// The slug-derived name of the cache file backing this wrapper.
    pub fn cache_file_name(&self) -> &str {
        self.store.cache_file_name()
    }

    /// Hit/miss counters for the backing store.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        self.store.stats()
    }

    /// Calls the wrapped function through the cache.
    ///
    /// * Arguments that cannot produce a cache key bypass caching entirely
    ///   for this call: the function runs, nothing is stored, no error is
    ///   raised.
    /// * A cache hit returns the stored value without invoking the
    ///   function.
    /// * A miss invokes the function, stores the result, synchronously
    ///   persists the cache file, and returns the result.
    ///
    /// A failure of the wrapped function itself (a panic) propagates
    /// unchanged and nothing is cached for that call.
    ///
    /// # Panics
    ///
    /// Panics on a cache I/O or deserialization failure; the call signature
    /// leaves no room to surface a [`CacheError`](crate::CacheError). Use
    /// [`try_call`](Memoized::try_call) to handle it instead.
    pub fn call(&mut self, args: A) -> R {
        match self.try_call(args) {
            Ok(value) => value,
            Err(e) => panic!(
                "memorize: cache failure in `{}`: {e}",
                self.store.cache_file_name()
            ),
        }
    }

    /// Like [`call`](Memoized::call), but surfaces cache I/O failures
    /// instead of panicking. The wrapped function's own behavior is
    /// identical on both paths.
    pub fn try_call(&mut self, args: A) -> Result<R> {
        let Some(key) = args.try_cache_key() else {
            // Unkeyable arguments: invoke directly, cache nothing.
            return Ok((self.func)(&args));
        };

        if let Some(hit) = self.store.try_get(&key)? {
            return Ok(hit);
        }

        let value = (self.func)(&args);
        self.store.try_insert(&key, value.clone())?;
        Ok(value)
    }
}

/// Introspecting a wrapper yields the wrapped function's documentation
/// string rather than wrapper-internal metadata.
impl<F, A, R> fmt::Display for Memoized<F, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.doc.unwrap_or(""))
    }
}
