//! In-memory configuration source.

use crate::application::ports::ConfigSource;
use std::collections::BTreeMap;

/// Read-only configuration source backed by a sorted map.
///
/// The sorted layout makes prefix queries a contiguous range scan, which is
/// what the config view resolver does on every resolution.
///
/// # Example
/// ```
/// use scoped_broker::{ConfigSource, MapConfigSource};
///
/// let config: MapConfigSource = [
///     ("broker.limiter.limiterClass".to_string(), "CountBasedLimiter".to_string()),
///     ("broker.limiter.count".to_string(), "10".to_string()),
/// ]
/// .into_iter()
/// .collect();
///
/// assert_eq!(config.get("broker.limiter.count").as_deref(), Some("10"));
/// assert!(config.has_prefix("broker.limiter."));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapConfigSource {
    entries: BTreeMap<String, String>,
}

impl MapConfigSource {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of configuration entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the configuration is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<BTreeMap<String, String>> for MapConfigSource {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

impl FromIterator<(String, String)> for MapConfigSource {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn entries_with_prefix(&self, prefix: &str) -> Vec<(String, String)> {
        self.entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}
