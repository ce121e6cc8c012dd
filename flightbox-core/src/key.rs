//! Cache key type for registry lookups.
//!
//! The cache itself is generic over any hashable key. [`CacheKey`] is the
//! ready-made key used by the registry client: a cheaply clonable string
//! (usually a request URL) that compares by value.
//!
//! ```
//! use flightbox_core::CacheKey;
//!
//! let key = CacheKey::new("https://pypi.org/pypi/requests/json");
//! assert_eq!(key.as_str(), "https://pypi.org/pypi/requests/json");
//! assert_eq!(key, CacheKey::from("https://pypi.org/pypi/requests/json"));
//! ```
//!
//! Keys are not normalized here. Rejecting empty or malformed identifiers is
//! the caller's job before a key reaches the cache.

use smol_str::SmolStr;
use std::fmt;

/// Identifier of a fetchable resource.
///
/// Backed by [`SmolStr`]: short keys are stored inline and longer keys are
/// reference counted, so cloning a key never copies the string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CacheKey(SmolStr);

impl CacheKey {
    /// Creates a new cache key.
    #[inline]
    pub fn new(s: impl Into<SmolStr>) -> Self {
        Self(s.into())
    }

    /// Creates a key from a static string without allocating.
    #[inline]
    pub const fn new_static(s: &'static str) -> Self {
        Self(SmolStr::new_static(s))
    }

    /// Returns the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the key is the empty string.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for CacheKey {
    #[inline]
    fn from(s: &str) -> Self {
        Self(SmolStr::new(s))
    }
}

impl From<String> for CacheKey {
    #[inline]
    fn from(s: String) -> Self {
        Self(SmolStr::from(s))
    }
}

impl From<&String> for CacheKey {
    #[inline]
    fn from(s: &String) -> Self {
        Self(SmolStr::new(s))
    }
}

impl From<SmolStr> for CacheKey {
    #[inline]
    fn from(s: SmolStr) -> Self {
        Self(s)
    }
}

impl AsRef<str> for CacheKey {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}
