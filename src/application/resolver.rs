//! Config view resolution.
//!
//! Resolves the effective configuration one scope type sees for a
//! `(scope type, resource key, factory name)` triple. Configuration keys
//! live under a fixed prefix and come in two shapes:
//!
//! ```text
//! broker.<factoryName>.<settingKey>                  # unscoped default
//! broker.<factoryName>.<scopeTypeName>.<settingKey>  # per-scope override
//! ```
//!
//! A scope-specific entry is visible only when resolving for that scope type
//! and takes precedence over the unscoped entry for the same setting. The
//! resolver answers for one scope type at a time; it never merges across
//! scope types.

use crate::application::ports::ConfigSource;
use crate::domain::key::ResourceKey;
use crate::domain::scope::ScopeType;
use std::collections::BTreeMap;

/// Fixed top-level prefix of all broker configuration keys.
pub const BROKER_CONFIG_PREFIX: &str = "broker";

/// Resolved, read-only settings for one factory at one scope type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    entries: BTreeMap<String, String>,
}

impl Settings {
    /// Look up a setting.
    pub fn get(&self, setting: &str) -> Option<&str> {
        self.entries.get(setting).map(String::as_str)
    }

    /// Check whether any setting is present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of settings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate over settings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Settings {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// The configuration visible to a resource factory for one scope type.
///
/// Produced by [`resolve_view`]; absence of any matching configuration key
/// yields an empty view, not an error.
#[derive(Debug, Clone)]
pub struct ConfigView<S: ScopeType> {
    scope_type: S,
    key: ResourceKey,
    factory_name: String,
    settings: Settings,
}

impl<S: ScopeType> ConfigView<S> {
    /// The scope type this view was resolved for.
    pub fn scope_type(&self) -> S {
        self.scope_type
    }

    /// The resource key the view was requested for.
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// The factory name the view was resolved for.
    pub fn factory_name(&self) -> &str {
        &self.factory_name
    }

    /// The resolved settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Look up a setting.
    pub fn get(&self, setting: &str) -> Option<&str> {
        self.settings.get(setting)
    }
}

/// Resolve the effective configuration for one scope type.
pub fn resolve_view<S: ScopeType>(
    config: &dyn ConfigSource,
    scope_type: S,
    key: &ResourceKey,
    factory_name: &str,
) -> ConfigView<S> {
    let prefix = format!("{}.{}.", BROKER_CONFIG_PREFIX, factory_name);

    let mut unscoped: BTreeMap<String, String> = BTreeMap::new();
    let mut scoped: BTreeMap<String, String> = BTreeMap::new();

    for (full_key, value) in config.entries_with_prefix(&prefix) {
        let rest = &full_key[prefix.len()..];
        match rest.split_once('.') {
            Some((segment, setting)) if is_scope_name::<S>(segment) => {
                if segment == scope_type.name() {
                    scoped.insert(setting.to_string(), value);
                }
            }
            _ => {
                unscoped.insert(rest.to_string(), value);
            }
        }
    }

    // Scope-specific entries win over unscoped ones for the same setting.
    unscoped.extend(scoped);

    ConfigView {
        scope_type,
        key: key.clone(),
        factory_name: factory_name.to_string(),
        settings: unscoped.into_iter().collect(),
    }
}

/// Check whether the configuration carries a scope-specific section for a
/// factory at the given scope type.
pub fn has_scoped_section<S: ScopeType>(
    config: &dyn ConfigSource,
    factory_name: &str,
    scope_type: S,
) -> bool {
    let prefix = format!(
        "{}.{}.{}.",
        BROKER_CONFIG_PREFIX,
        factory_name,
        scope_type.name()
    );
    config.has_prefix(&prefix)
}

fn is_scope_name<S: ScopeType>(segment: &str) -> bool {
    S::all().iter().any(|t| t.name() == segment)
}
