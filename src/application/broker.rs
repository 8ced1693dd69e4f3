//! The broker tree: scope nodes, singleton caches, and multi-level
//! composition.
//!
//! Each broker is a view onto a node in a tree of scope instances. A node
//! owns the singleton cache for resources anchored at its scope instance and
//! holds a shared back reference to its parent; parents never reference
//! children, so the chain tears down bottom-up with plain `Arc` ownership
//! and no close protocol.

use crate::application::error::BrokerError;
use crate::application::factory::{FactoryRegistry, SharedResourceFactory};
use crate::application::ports::{ConfigSource, ResourceStore, SlotKey, SlotKind};
use crate::application::resolver::{has_scoped_section, resolve_view, ConfigView};
use crate::domain::key::ResourceKey;
use crate::domain::limiter::{MultiLimiter, SharedLimiter};
use crate::domain::scope::{ScopeInstance, ScopeType};
use std::sync::Arc;
use tracing::{debug, trace};

/// One node in the scope tree.
///
/// The cache is node-exclusive: only brokers bound to this node mutate it,
/// and only through per-slot guards.
#[derive(Debug)]
struct ScopeNode<S: ScopeType, C: ResourceStore> {
    instance: ScopeInstance<S>,
    parent: Option<Arc<ScopeNode<S, C>>>,
    cache: C,
}

/// A node in the scope tree owning a resource cache and a link to its
/// parent.
///
/// Cloning a broker clones the view, not the tree: clones share the same
/// node, cache, configuration, and factories.
pub struct SharedResourcesBroker<S: ScopeType, C: ResourceStore> {
    config: Arc<dyn ConfigSource>,
    factories: Arc<FactoryRegistry<S, C>>,
    node: Arc<ScopeNode<S, C>>,
}

impl<S: ScopeType, C: ResourceStore> Clone for SharedResourcesBroker<S, C> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            factories: Arc::clone(&self.factories),
            node: Arc::clone(&self.node),
        }
    }
}

impl<S: ScopeType, C: ResourceStore> SharedResourcesBroker<S, C> {
    /// Create the root broker of a new scope tree.
    ///
    /// `root_instance` must be an instance of the root scope type. Most
    /// callers want [`create_default_top_level_broker`] instead, which wires
    /// the default cache and factories.
    ///
    /// [`create_default_top_level_broker`]: crate::infrastructure::bootstrap::create_default_top_level_broker
    pub fn top_level(
        config: Arc<dyn ConfigSource>,
        factories: Arc<FactoryRegistry<S, C>>,
        root_instance: ScopeInstance<S>,
        cache: C,
    ) -> Result<Self, BrokerError> {
        if !root_instance.scope_type().is_root() {
            return Err(BrokerError::configuration(format!(
                "top-level broker requires the root scope type, got '{}'",
                root_instance.scope_type().name()
            )));
        }
        debug!(scope = %root_instance, "creating top-level broker");
        Ok(Self {
            config,
            factories,
            node: Arc::new(ScopeNode {
                instance: root_instance,
                parent: None,
                cache,
            }),
        })
    }

    /// The scope instance this broker is bound to.
    pub fn scope(&self) -> &ScopeInstance<S> {
        &self.node.instance
    }

    /// The shared configuration source.
    pub fn config(&self) -> &dyn ConfigSource {
        self.config.as_ref()
    }

    /// The nearest ancestor-or-self scope instance of the given type.
    ///
    /// Fails with [`BrokerError::ScopeResolution`] when no instance of that
    /// type lies on the path to the root; this cannot happen for the root
    /// type itself.
    pub fn scope_instance(&self, scope_type: S) -> Result<ScopeInstance<S>, BrokerError> {
        self.node_at(scope_type)
            .map(|node| node.instance.clone())
    }

    /// Resolve the configuration one scope type sees for a resource.
    pub fn get_config_view(
        &self,
        scope_type: S,
        key: &ResourceKey,
        factory_name: &str,
    ) -> ConfigView<S> {
        resolve_view(self.config.as_ref(), scope_type, key, factory_name)
    }

    /// Start building a child broker bound to a new named scope instance.
    pub fn new_subscoped_builder(
        &self,
        instance: ScopeInstance<S>,
    ) -> SubscopedBrokerBuilder<S, C> {
        SubscopedBrokerBuilder {
            parent: self.clone(),
            instance,
        }
    }

    /// Build or retrieve the resource visible to this broker.
    ///
    /// Fails with [`BrokerError::NotConfigured`] when no factory is
    /// registered under `factory_name`.
    pub fn create_resource(
        &self,
        key: &ResourceKey,
        factory_name: &str,
    ) -> Result<SharedLimiter, BrokerError> {
        let factory = self
            .factories
            .get(factory_name)
            .ok_or_else(|| BrokerError::NotConfigured {
                factory: factory_name.to_string(),
            })?
            .clone();
        self.create_scoped_resource(factory.as_ref(), key)
    }

    /// The composition algorithm behind [`create_resource`].
    ///
    /// 1. Collect the scope types on this broker's path to the root that
    ///    carry a scope-specific section for the factory.
    /// 2. With no such section, build-or-fetch once at the root node from
    ///    the unscoped view; the instance is shared tree-wide.
    /// 3. Otherwise build-or-fetch one sub-resource per configured type in
    ///    the nearest ancestor-or-self node of that type, broadest level
    ///    first, then wrap them (narrowest first) in a [`MultiLimiter`]
    ///    cached at this broker's own node.
    ///
    /// Sub-resources are fully built before the composite slot is touched,
    /// so cache guards are only ever taken root-to-leaf and a failed level
    /// build leaves every slot it touched empty.
    ///
    /// [`create_resource`]: SharedResourcesBroker::create_resource
    pub fn create_scoped_resource(
        &self,
        factory: &dyn SharedResourceFactory<S, C>,
        key: &ResourceKey,
    ) -> Result<SharedLimiter, BrokerError> {
        let factory_name = factory.name();
        trace!(resource = %key, factory = factory_name, scope = %self.node.instance,
            "resource requested");

        // Configured scope types along the path, collected leaf-to-root.
        let mut configured: Vec<&Arc<ScopeNode<S, C>>> = Vec::new();
        let mut current = Some(&self.node);
        while let Some(node) = current {
            if has_scoped_section(self.config.as_ref(), factory_name, node.instance.scope_type())
            {
                configured.push(node);
            }
            current = node.parent.as_ref();
        }

        if configured.is_empty() {
            let root = self.root_node();
            let view = self.get_config_view(S::root(), key, factory_name);
            return root.cache.get_or_try_build(
                SlotKey::new(key.clone(), factory_name, SlotKind::Entry),
                || {
                    debug!(resource = %key, factory = factory_name,
                        scope = %root.instance, "building unscoped resource");
                    factory.build_limiter(&view)
                },
            );
        }

        // Build each level's sub-resource broadest-first, at the node that
        // anchors it.
        let mut parts: Vec<SharedLimiter> = Vec::with_capacity(configured.len());
        for node in configured.iter().rev() {
            let scope_type = node.instance.scope_type();
            let view = self.get_config_view(scope_type, key, factory_name);
            let part = node.cache.get_or_try_build(
                SlotKey::new(key.clone(), factory_name, SlotKind::Level),
                || {
                    debug!(resource = %key, factory = factory_name,
                        scope = %node.instance, "building scoped sub-resource");
                    factory.build_limiter(&view)
                },
            )?;
            parts.push(part);
        }

        // Narrowest scope first in the composite.
        parts.reverse();
        self.node.cache.get_or_try_build(
            SlotKey::new(key.clone(), factory_name, SlotKind::Entry),
            || {
                debug!(resource = %key, factory = factory_name,
                    scope = %self.node.instance, levels = parts.len(),
                    "building composite resource");
                Ok(Arc::new(MultiLimiter::new(parts)) as SharedLimiter)
            },
        )
    }

    fn node_at(&self, scope_type: S) -> Result<&Arc<ScopeNode<S, C>>, BrokerError> {
        let mut current = Some(&self.node);
        while let Some(node) = current {
            if node.instance.scope_type() == scope_type {
                return Ok(node);
            }
            current = node.parent.as_ref();
        }
        Err(BrokerError::ScopeResolution {
            scope: scope_type.name().to_string(),
        })
    }

    fn root_node(&self) -> &Arc<ScopeNode<S, C>> {
        let mut node = &self.node;
        while let Some(parent) = node.parent.as_ref() {
            node = parent;
        }
        node
    }
}

/// Builder for a child broker bound to a new named scope instance.
pub struct SubscopedBrokerBuilder<S: ScopeType, C: ResourceStore> {
    parent: SharedResourcesBroker<S, C>,
    instance: ScopeInstance<S>,
}

impl<S: ScopeType, C: ResourceStore + Default> SubscopedBrokerBuilder<S, C> {
    /// Create the child broker.
    ///
    /// The child's scope type must be strictly narrower than the parent's;
    /// the root type cannot be subscoped into.
    pub fn build(self) -> Result<SharedResourcesBroker<S, C>, BrokerError> {
        if self.instance.scope_type().is_root() {
            return Err(BrokerError::configuration(
                "cannot subscope into the root scope type",
            ));
        }
        if self.instance.scope_type() <= self.parent.scope().scope_type() {
            return Err(BrokerError::configuration(format!(
                "child scope type '{}' is not narrower than parent scope type '{}'",
                self.instance.scope_type().name(),
                self.parent.scope().scope_type().name()
            )));
        }
        debug!(scope = %self.instance, parent = %self.parent.scope(), "subscoping broker");
        Ok(SharedResourcesBroker {
            config: Arc::clone(&self.parent.config),
            factories: Arc::clone(&self.parent.factories),
            node: Arc::new(ScopeNode {
                instance: self.instance,
                parent: Some(Arc::clone(&self.parent.node)),
                cache: C::default(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scope::SimpleScopeType;
    use crate::infrastructure::cache::ShardedCache;
    use crate::infrastructure::config::MapConfigSource;

    type Broker = SharedResourcesBroker<SimpleScopeType, ShardedCache>;

    fn broker_for(entries: &[(&str, &str)]) -> Broker {
        let source: MapConfigSource = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SharedResourcesBroker::top_level(
            Arc::new(source),
            Arc::new(FactoryRegistry::with_defaults()),
            ScopeInstance::root(),
            ShardedCache::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_top_level_requires_root_scope_type() {
        let source = MapConfigSource::default();
        let result: Result<Broker, _> = SharedResourcesBroker::top_level(
            Arc::new(source),
            Arc::new(FactoryRegistry::with_defaults()),
            ScopeInstance::new(SimpleScopeType::Local, "local1"),
            ShardedCache::default(),
        );
        assert!(matches!(result, Err(BrokerError::Configuration { .. })));
    }

    #[test]
    fn test_subscoping_creates_narrower_broker() {
        let root = broker_for(&[]);
        let child = root
            .new_subscoped_builder(ScopeInstance::new(SimpleScopeType::Local, "local1"))
            .build()
            .unwrap();

        assert_eq!(child.scope().scope_type(), SimpleScopeType::Local);
        assert_eq!(child.scope().name(), "local1");
        assert_eq!(root.scope().scope_type(), SimpleScopeType::Global);
    }

    #[test]
    fn test_subscoping_into_root_is_rejected() {
        let root = broker_for(&[]);
        let result = root
            .new_subscoped_builder(ScopeInstance::root())
            .build();
        assert!(matches!(result, Err(BrokerError::Configuration { .. })));
    }

    #[test]
    fn test_scope_instance_resolution() {
        let root = broker_for(&[]);
        let child = root
            .new_subscoped_builder(ScopeInstance::new(SimpleScopeType::Local, "local1"))
            .build()
            .unwrap();

        // Nearest ancestor-or-self per type.
        assert_eq!(
            child.scope_instance(SimpleScopeType::Local).unwrap().name(),
            "local1"
        );
        assert_eq!(
            child.scope_instance(SimpleScopeType::Global).unwrap(),
            ScopeInstance::root()
        );

        // The root broker has no local scope on its path.
        assert_eq!(
            root.scope_instance(SimpleScopeType::Local),
            Err(BrokerError::ScopeResolution {
                scope: "local".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_factory_is_not_configured() {
        let root = broker_for(&[]);
        let err = root
            .create_resource(&ResourceKey::new("resource"), "connectionPool")
            .unwrap_err();
        assert_eq!(
            err,
            BrokerError::NotConfigured {
                factory: "connectionPool".to_string()
            }
        );
    }

    #[test]
    fn test_repeated_requests_return_the_same_instance() {
        let root = broker_for(&[
            ("broker.limiter.limiterClass", "CountBasedLimiter"),
            ("broker.limiter.count", "10"),
        ]);
        let key = ResourceKey::new("resource");

        let a = root.create_resource(&key, "limiter").unwrap();
        let b = root.create_resource(&key, "limiter").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_distinct_keys_get_distinct_instances() {
        let root = broker_for(&[
            ("broker.limiter.limiterClass", "CountBasedLimiter"),
            ("broker.limiter.count", "10"),
        ]);

        let a = root
            .create_resource(&ResourceKey::new("reads"), "limiter")
            .unwrap();
        let b = root
            .create_resource(&ResourceKey::new("writes"), "limiter")
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_failed_build_leaves_slot_retryable() {
        let root = broker_for(&[("broker.limiter.limiterClass", "CountBasedLimiter")]);
        let key = ResourceKey::new("resource");

        // `count` is missing, so every attempt fails the same way instead of
        // caching a broken slot.
        for _ in 0..2 {
            let err = root.create_resource(&key, "limiter").unwrap_err();
            assert!(matches!(err, BrokerError::Configuration { .. }));
        }
    }

    #[test]
    fn test_concurrent_first_time_access_builds_once() {
        use std::thread;

        let root = Arc::new(broker_for(&[
            ("broker.limiter.limiterClass", "CountBasedLimiter"),
            ("broker.limiter.count", "100"),
        ]));
        let key = ResourceKey::new("resource");

        let mut handles = vec![];
        for _ in 0..8 {
            let root = Arc::clone(&root);
            let key = key.clone();
            handles.push(thread::spawn(move || {
                root.create_resource(&key, "limiter").unwrap()
            }));
        }

        let limiters: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for limiter in &limiters[1..] {
            assert!(Arc::ptr_eq(&limiters[0], limiter));
        }
    }
}
