//! Singleton cache implementation for scope nodes.
//!
//! Provides concurrent, sharded storage for built resources.

use crate::application::error::BrokerError;
use crate::application::ports::{ResourceStore, SlotKey};
use crate::domain::limiter::SharedLimiter;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Thread-safe slot cache backed by DashMap.
///
/// DashMap provides lock-free reads and fine-grained per-shard locking for
/// writes, so building one resource never serializes requests for unrelated
/// slots. The build closure runs while holding the vacant entry, so each
/// slot is built exactly once no matter how many callers race for it.
#[derive(Debug, Default)]
pub struct ShardedCache {
    slots: DashMap<SlotKey, SharedLimiter>,
}

impl ShardedCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }
}

impl ResourceStore for ShardedCache {
    fn get(&self, key: &SlotKey) -> Option<SharedLimiter> {
        self.slots.get(key).map(|entry| entry.value().clone())
    }

    fn get_or_try_build<F>(&self, key: SlotKey, build: F) -> Result<SharedLimiter, BrokerError>
    where
        F: FnOnce() -> Result<SharedLimiter, BrokerError>,
    {
        match self.slots.entry(key) {
            Entry::Occupied(occupied) => Ok(occupied.get().clone()),
            Entry::Vacant(vacant) => {
                // A failed build drops the vacant entry without inserting,
                // so the slot stays empty and a later caller may retry.
                let resource = build()?;
                vacant.insert(resource.clone());
                Ok(resource)
            }
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::key::ResourceKey;
    use crate::domain::limiter::{CountBasedLimiter, NoopLimiter};
    use crate::application::ports::SlotKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn slot(resource: &str, kind: SlotKind) -> SlotKey {
        SlotKey::new(ResourceKey::new(resource), "limiter", kind)
    }

    #[test]
    fn test_build_happens_once() {
        let cache = ShardedCache::new();
        let builds = AtomicUsize::new(0);

        for _ in 0..3 {
            let resource = cache
                .get_or_try_build(slot("r", SlotKind::Entry), || {
                    builds.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new(NoopLimiter::new()) as SharedLimiter)
                })
                .unwrap();
            assert!(resource.as_any().downcast_ref::<NoopLimiter>().is_some());
        }

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_slot_kinds_do_not_collide() {
        let cache = ShardedCache::new();

        let entry = cache
            .get_or_try_build(slot("r", SlotKind::Entry), || {
                Ok(Arc::new(CountBasedLimiter::new(1)) as SharedLimiter)
            })
            .unwrap();
        let level = cache
            .get_or_try_build(slot("r", SlotKind::Level), || {
                Ok(Arc::new(CountBasedLimiter::new(2)) as SharedLimiter)
            })
            .unwrap();

        assert!(!Arc::ptr_eq(&entry, &level));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failed_build_leaves_slot_empty() {
        let cache = ShardedCache::new();
        let key = slot("r", SlotKind::Entry);

        let err = cache
            .get_or_try_build(key.clone(), || {
                Err(BrokerError::configuration("missing count"))
            })
            .unwrap_err();
        assert!(matches!(err, BrokerError::Configuration { .. }));
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());

        // Retry succeeds and populates the slot.
        cache
            .get_or_try_build(key.clone(), || {
                Ok(Arc::new(NoopLimiter::new()) as SharedLimiter)
            })
            .unwrap();
        assert!(cache.get(&key).is_some());
    }

    #[test]
    fn test_concurrent_callers_observe_one_instance() {
        use std::thread;

        let cache = Arc::new(ShardedCache::new());
        let builds = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];

        for _ in 0..10 {
            let cache = Arc::clone(&cache);
            let builds = Arc::clone(&builds);
            handles.push(thread::spawn(move || {
                cache
                    .get_or_try_build(slot("r", SlotKind::Entry), || {
                        builds.fetch_add(1, Ordering::SeqCst);
                        Ok(Arc::new(CountBasedLimiter::new(10)) as SharedLimiter)
                    })
                    .unwrap()
            }));
        }

        let resources: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        for resource in &resources[1..] {
            assert!(Arc::ptr_eq(&resources[0], resource));
        }
    }
}
