//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the
//! application layer needs. Infrastructure adapters implement these ports.

use crate::application::error::BrokerError;
use crate::domain::key::ResourceKey;
use crate::domain::limiter::SharedLimiter;
use std::fmt::Debug;

/// Port for the raw hierarchical key/value configuration store.
///
/// The store is read-only and shared by the whole broker tree. Keys are
/// dot-segmented paths; the resolver queries them by prefix.
pub trait ConfigSource: Send + Sync + Debug {
    /// Look up a single key.
    fn get(&self, key: &str) -> Option<String>;

    /// All entries whose key starts with `prefix`, in key order.
    fn entries_with_prefix(&self, prefix: &str) -> Vec<(String, String)>;

    /// Check whether any key starts with `prefix`.
    fn has_prefix(&self, prefix: &str) -> bool {
        !self.entries_with_prefix(prefix).is_empty()
    }
}

/// Which resource a cache slot holds at a scope node.
///
/// A node can cache both the per-level sub-resource anchored at it and the
/// entry resource it hands out for the same `(key, factory)` pair, so the
/// slot kind is part of the cache identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// What the broker hands out: a directly built resource or a composite.
    Entry,
    /// One level's sub-resource, anchored at this node's scope instance.
    Level,
}

/// Identity of a singleton cache slot within one scope node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    /// Which logical resource.
    pub key: ResourceKey,
    /// Which resource category built it.
    pub factory: String,
    /// Whether this slot holds the entry resource or a level sub-resource.
    pub kind: SlotKind,
}

impl SlotKey {
    /// Create a slot key.
    pub fn new(key: ResourceKey, factory: impl Into<String>, kind: SlotKind) -> Self {
        Self {
            key,
            factory: factory.into(),
            kind,
        }
    }
}

/// Port for a scope node's singleton resource cache.
///
/// A slot is either empty or built; the transition happens at most once per
/// slot under a per-slot guard, never a cache-wide lock, and there is no
/// eviction. A failed build must leave the slot empty so a later caller may
/// retry.
pub trait ResourceStore: Send + Sync + Debug {
    /// Get the resource in a slot, if already built.
    fn get(&self, key: &SlotKey) -> Option<SharedLimiter>;

    /// Get the resource in a slot, building it if the slot is empty.
    ///
    /// The build closure runs under the slot's guard: concurrent callers for
    /// the same slot observe exactly one build, and every caller gets the
    /// same instance. An `Err` from the closure is propagated without
    /// populating the slot.
    fn get_or_try_build<F>(&self, key: SlotKey, build: F) -> Result<SharedLimiter, BrokerError>
    where
        F: FnOnce() -> Result<SharedLimiter, BrokerError>;

    /// Number of built slots.
    fn len(&self) -> usize;

    /// Check whether no slot has been built yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
