use std::cell::{Cell, RefCell};
use std::sync::Mutex;

/// Fallible cache-key generation.
///
/// A memoized call is keyed by the ordered tuple of its arguments, so every
/// argument must be able to produce a *stable* string representation. Not
/// every value can: a mutable sequence, or anything with interior
/// mutability, has no representation that is guaranteed to still describe it
/// the next time the program runs.
///
/// `try_cache_key` is therefore a capability probe rather than a plain
/// conversion:
///
/// * `Some(key)` - the value can participate in a cache key.
/// * `None` - the value cannot be keyed. A memoized call receiving such an
///   argument silently bypasses the cache for that call only: the underlying
///   function runs, nothing is stored, and no error reaches the caller.
///
/// # Implementing for your own types
///
/// Either implement `CacheableKey` directly for full control over the key
/// format, or opt into the Debug-based default by implementing the
/// [`DefaultCacheableKey`] marker trait (not both).
///
/// ```
/// use memorize_core::CacheableKey;
///
/// struct UserId(u64);
///
/// impl CacheableKey for UserId {
///     fn try_cache_key(&self) -> Option<String> {
///         Some(format!("user:{}", self.0))
///     }
/// }
///
/// assert_eq!(UserId(7).try_cache_key(), Some("user:7".to_string()));
/// ```
pub trait CacheableKey {
    /// Returns the value's cache-key fragment, or `None` if the value
    /// cannot serve as part of a mapping key.
    fn try_cache_key(&self) -> Option<String>;
}

/// Opt-in marker that derives a cache key from a type's `Debug` rendering.
///
/// Convenient for receivers and argument structs that already derive
/// `Debug`. Note the sharp edge inherited by anything keyed this way: two
/// values whose Debug output is identical share cache entries. For method
/// receivers that is often exactly what you want (two configured-alike
/// instances reuse each other's results), but if instances must be kept
/// apart, include a distinguishing field in the Debug output or implement
/// [`CacheableKey`] manually.
///
/// ```
/// use memorize_core::{CacheableKey, DefaultCacheableKey};
///
/// #[derive(Debug)]
/// struct Converter {
///     rate: f64,
/// }
///
/// impl DefaultCacheableKey for Converter {}
///
/// let c = Converter { rate: 1.25 };
/// assert!(c.try_cache_key().is_some());
/// ```
pub trait DefaultCacheableKey: std::fmt::Debug {}

impl<T: DefaultCacheableKey> CacheableKey for T {
    fn try_cache_key(&self) -> Option<String> {
        Some(format!("{:?}", self))
    }
}

macro_rules! impl_display_keys {
    ($($t:ty),* $(,)?) => {
        $(
            impl CacheableKey for $t {
                fn try_cache_key(&self) -> Option<String> {
                    Some(self.to_string())
                }
            }
        )*
    };
}

impl_display_keys!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, bool, char, String
);

impl CacheableKey for str {
    fn try_cache_key(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl CacheableKey for &str {
    fn try_cache_key(&self) -> Option<String> {
        Some(self.to_string())
    }
}

// Floats key by bit pattern: stable across runs, and distinguishes values
// (like 0.0 / -0.0, or NaN payloads) that Display would conflate.
impl CacheableKey for f32 {
    fn try_cache_key(&self) -> Option<String> {
        Some(format!("f32:{:08x}", self.to_bits()))
    }
}

impl CacheableKey for f64 {
    fn try_cache_key(&self) -> Option<String> {
        Some(format!("f64:{:016x}", self.to_bits()))
    }
}

impl CacheableKey for () {
    fn try_cache_key(&self) -> Option<String> {
        Some("unit".to_string())
    }
}

impl<T: CacheableKey> CacheableKey for Option<T> {
    fn try_cache_key(&self) -> Option<String> {
        match self {
            Some(value) => value.try_cache_key().map(|k| format!("some({k})")),
            None => Some("none".to_string()),
        }
    }
}

impl<T: CacheableKey, const N: usize> CacheableKey for [T; N] {
    fn try_cache_key(&self) -> Option<String> {
        let mut parts = Vec::with_capacity(N);
        for item in self {
            parts.push(item.try_cache_key()?);
        }
        Some(format!("[{}]", parts.join(",")))
    }
}

macro_rules! impl_tuple_keys {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: CacheableKey),+> CacheableKey for ($($name,)+) {
            fn try_cache_key(&self) -> Option<String> {
                let parts = [$( self.$idx.try_cache_key()? ),+];
                Some(parts.join("|"))
            }
        }
    };
}

impl_tuple_keys!(A: 0);
impl_tuple_keys!(A: 0, B: 1);
impl_tuple_keys!(A: 0, B: 1, C: 2);
impl_tuple_keys!(A: 0, B: 1, C: 2, D: 3);
impl_tuple_keys!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_tuple_keys!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

/// Mutable sequences cannot be keyed: their contents may differ the next
/// time the same binding is passed, so a stored key would silently go stale.
/// Calls taking a `Vec` argument bypass the cache on every invocation.
impl<T> CacheableKey for Vec<T> {
    fn try_cache_key(&self) -> Option<String> {
        None
    }
}

impl<T> CacheableKey for Cell<T> {
    fn try_cache_key(&self) -> Option<String> {
        None
    }
}

impl<T> CacheableKey for RefCell<T> {
    fn try_cache_key(&self) -> Option<String> {
        None
    }
}

impl<T> CacheableKey for Mutex<T> {
    fn try_cache_key(&self) -> Option<String> {
        None
    }
}
