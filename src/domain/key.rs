//! Resource keys.

use std::fmt;

/// Identity of a logical resource, independent of scope.
///
/// The broker uses the key purely for cache identity; the key does not
/// participate in configuration resolution. Two requests with equal keys
/// (and the same factory) resolve to the same cached resource at a given
/// scope instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Create a key for a named resource.
    pub fn new(resource: impl Into<String>) -> Self {
        Self(resource.into())
    }

    /// The resource name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKey {
    fn from(resource: &str) -> Self {
        Self::new(resource)
    }
}

impl From<String> for ResourceKey {
    fn from(resource: String) -> Self {
        Self(resource)
    }
}
