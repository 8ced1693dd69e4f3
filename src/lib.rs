//! # scoped-broker
//!
//! A hierarchical shared-resource broker: a tree of nested scopes that
//! lazily creates, caches, and shares rate limiters according to layered
//! configuration.
//!
//! The broker guarantees exactly one instance of a given resource per scope
//! level and composes per-level instances into a single limiter usable by
//! callers who only see the leaf scope. Identity is the contract: two
//! brokers under the same scope instance observe the *same object* for a
//! resource anchored there, not merely an equal one.
//!
//! ## Quick Start
//!
//! ```rust
//! use scoped_broker::{
//!     create_default_top_level_broker, MapConfigSource, ResourceKey, ScopeInstance,
//!     SimpleScopeType,
//! };
//! use std::sync::Arc;
//!
//! let config: MapConfigSource = [
//!     ("broker.limiter.limiterClass".to_string(), "CountBasedLimiter".to_string()),
//!     ("broker.limiter.count".to_string(), "10".to_string()),
//! ]
//! .into_iter()
//! .collect();
//!
//! let broker = create_default_top_level_broker::<SimpleScopeType>(
//!     Arc::new(config),
//!     ScopeInstance::root(),
//! )
//! .unwrap();
//!
//! // With no scope-specific configuration, the limiter is a tree-wide
//! // singleton anchored at the root scope.
//! let limiter = broker
//!     .create_resource(&ResourceKey::new("resource"), "limiter")
//!     .unwrap();
//! assert!(limiter.try_acquire(1));
//! ```
//!
//! ## Scopes
//!
//! A [`ScopeType`] is a level in the sharing hierarchy; [`SimpleScopeType`]
//! provides a two-level hierarchy (`Global` root, named `Local` children).
//! A [`ScopeInstance`] is a named occurrence of a scope type; child brokers
//! are created per instance:
//!
//! ```rust
//! # use scoped_broker::{create_default_top_level_broker, MapConfigSource,
//! #     ScopeInstance, SimpleScopeType};
//! # use std::sync::Arc;
//! # let broker = create_default_top_level_broker::<SimpleScopeType>(
//! #     Arc::new(MapConfigSource::new()), ScopeInstance::root()).unwrap();
//! let local1 = broker
//!     .new_subscoped_builder(ScopeInstance::new(SimpleScopeType::Local, "local1"))
//!     .build()
//!     .unwrap();
//! ```
//!
//! ## Configuration Grammar
//!
//! All broker configuration lives under the fixed `broker` prefix:
//!
//! ```text
//! broker.<factoryName>.<settingKey>                  # unscoped default
//! broker.<factoryName>.<scopeTypeName>.<settingKey>  # per-scope override
//! ```
//!
//! The reference limiter factory (`limiter`) recognizes `limiterClass`
//! (selects `NoopLimiter` or `CountBasedLimiter`; absent means no-op) and
//! `count` (permit budget, required by the count-based limiter).
//!
//! When a resource is configured at several scope levels, the broker builds
//! one sub-limiter per level, each anchored and cached at its own scope
//! instance, and hands out a [`MultiLimiter`] enforcing all of them
//! conjunctively, narrowest scope first. Sibling scopes share the broader
//! components and get distinct narrow ones.
//!
//! ## Concurrency
//!
//! All operations are synchronous and callable from any number of threads.
//! Singleton creation is guarded per cache slot (never a tree-wide lock):
//! the first caller builds, every concurrent and later caller observes the
//! same instance. A failed build never populates its slot, so a later
//! caller may retry.
//!
//! ## Errors
//!
//! Fallible operations return [`BrokerError`]: `NotConfigured` for an
//! unknown factory name, `Configuration` for unknown implementation
//! selectors or missing/malformed settings, and `ScopeResolution` for scope
//! types absent from the requesting broker's path. Substituting the no-op
//! limiter when no selector is configured is a designed default, not an
//! error.

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    key::ResourceKey,
    limiter::{CountBasedLimiter, Limiter, MultiLimiter, NoopLimiter, SharedLimiter},
    scope::{ScopeInstance, ScopeType, SimpleScopeType},
};

pub use application::{
    broker::{SharedResourcesBroker, SubscopedBrokerBuilder},
    error::BrokerError,
    factory::{
        FactoryRegistry, LimiterConstructor, LimiterRegistry, SharedLimiterFactory,
        SharedResourceFactory, COUNT_BASED_LIMITER, COUNT_KEY, LIMITER_CLASS_KEY,
        LIMITER_FACTORY_NAME, NOOP_LIMITER,
    },
    ports::{ConfigSource, ResourceStore, SlotKey, SlotKind},
    resolver::{ConfigView, Settings, BROKER_CONFIG_PREFIX},
};

pub use infrastructure::{
    bootstrap::{create_default_top_level_broker, DefaultBroker},
    cache::ShardedCache,
    config::MapConfigSource,
};
