//! Resource factory protocol and the shared limiter factory.
//!
//! A factory is a named, stateless capability: it decides the scope type an
//! unconfigured resource is anchored at by default, and builds resource
//! instances from resolved config views. Concrete limiter implementations
//! are selected by name through a [`LimiterRegistry`] populated at startup,
//! not discovered at runtime.

use crate::application::broker::SharedResourcesBroker;
use crate::application::error::BrokerError;
use crate::application::ports::ResourceStore;
use crate::application::resolver::{has_scoped_section, ConfigView, Settings};
use crate::domain::limiter::{CountBasedLimiter, NoopLimiter, SharedLimiter};
use crate::domain::scope::ScopeType;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name of the reference limiter factory.
pub const LIMITER_FACTORY_NAME: &str = "limiter";

/// Setting selecting which limiter implementation to build.
pub const LIMITER_CLASS_KEY: &str = "limiterClass";

/// Setting holding the permit budget of the count-based limiter.
pub const COUNT_KEY: &str = "count";

/// Registered name of the count-based limiter implementation.
pub const COUNT_BASED_LIMITER: &str = "CountBasedLimiter";

/// Registered name of the no-op limiter implementation.
pub const NOOP_LIMITER: &str = "NoopLimiter";

/// Pluggable capability every resource category implements.
///
/// Factories are stateless; all sharing state lives in the broker tree's
/// caches. `create_resource` honors the multi-level composition rule by
/// delegating to [`SharedResourcesBroker::create_scoped_resource`].
pub trait SharedResourceFactory<S: ScopeType, C: ResourceStore>: Send + Sync {
    /// The factory/category name used in configuration keys and cache slots.
    fn name(&self) -> &str;

    /// The scope type an unconfigured resource is shared at by default.
    ///
    /// Returns the root scope type when no scope-specific section exists for
    /// this factory anywhere in the configuration.
    fn get_auto_scope(&self, broker: &SharedResourcesBroker<S, C>, view: &ConfigView<S>) -> S;

    /// Build or retrieve the resource visible to the requesting broker,
    /// honoring per-level sharing and multi-level composition.
    fn create_resource(
        &self,
        broker: &SharedResourcesBroker<S, C>,
        view: &ConfigView<S>,
    ) -> Result<SharedLimiter, BrokerError>;

    /// Build one limiter instance from a single level's config view.
    ///
    /// This is the per-level primitive the broker's composition walk calls;
    /// it never touches any cache.
    fn build_limiter(&self, view: &ConfigView<S>) -> Result<SharedLimiter, BrokerError>;
}

/// Constructor for a named limiter implementation.
pub type LimiterConstructor = fn(&Settings) -> Result<SharedLimiter, BrokerError>;

/// Registry mapping implementation names to constructors.
///
/// Populated at startup and looked up by the `limiterClass` selector.
#[derive(Debug, Clone)]
pub struct LimiterRegistry {
    constructors: BTreeMap<String, LimiterConstructor>,
}

impl LimiterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Create a registry with the reference implementations registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(NOOP_LIMITER, build_noop);
        registry.register(COUNT_BASED_LIMITER, build_count_based);
        registry
    }

    /// Register an implementation under a selector name.
    pub fn register(&mut self, name: impl Into<String>, constructor: LimiterConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    /// Look up a constructor by selector name.
    pub fn get(&self, name: &str) -> Option<LimiterConstructor> {
        self.constructors.get(name).copied()
    }
}

impl Default for LimiterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn build_noop(_settings: &Settings) -> Result<SharedLimiter, BrokerError> {
    Ok(Arc::new(NoopLimiter::new()))
}

fn build_count_based(settings: &Settings) -> Result<SharedLimiter, BrokerError> {
    let raw = settings.get(COUNT_KEY).ok_or_else(|| {
        BrokerError::configuration(format!(
            "'{}' requires the '{}' setting",
            COUNT_BASED_LIMITER, COUNT_KEY
        ))
    })?;
    let count: u64 = raw.parse().map_err(|_| {
        BrokerError::configuration(format!(
            "invalid '{}' value '{}': expected a non-negative integer",
            COUNT_KEY, raw
        ))
    })?;
    Ok(Arc::new(CountBasedLimiter::new(count)))
}

/// The reference limiter factory.
///
/// Builds the limiter selected by the `limiterClass` setting; when no
/// selector is configured at all, substitutes the no-op limiter. This
/// substitution is a designed default, not an error path.
#[derive(Debug, Clone, Default)]
pub struct SharedLimiterFactory {
    registry: LimiterRegistry,
}

impl SharedLimiterFactory {
    /// Create the factory with the default implementation registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the factory with a custom implementation registry.
    pub fn with_registry(registry: LimiterRegistry) -> Self {
        Self { registry }
    }
}

impl<S: ScopeType, C: ResourceStore> SharedResourceFactory<S, C> for SharedLimiterFactory {
    fn name(&self) -> &str {
        LIMITER_FACTORY_NAME
    }

    fn get_auto_scope(&self, broker: &SharedResourcesBroker<S, C>, _view: &ConfigView<S>) -> S {
        let scoped_anywhere = S::all()
            .iter()
            .any(|t| has_scoped_section(broker.config(), LIMITER_FACTORY_NAME, *t));
        if scoped_anywhere {
            broker.scope().scope_type()
        } else {
            S::root()
        }
    }

    fn create_resource(
        &self,
        broker: &SharedResourcesBroker<S, C>,
        view: &ConfigView<S>,
    ) -> Result<SharedLimiter, BrokerError> {
        broker.create_scoped_resource(self, view.key())
    }

    fn build_limiter(&self, view: &ConfigView<S>) -> Result<SharedLimiter, BrokerError> {
        match view.get(LIMITER_CLASS_KEY) {
            None | Some("") => Ok(Arc::new(NoopLimiter::new())),
            Some(class) => {
                let constructor = self.registry.get(class).ok_or_else(|| {
                    BrokerError::configuration(format!(
                        "unknown limiter implementation '{}'",
                        class
                    ))
                })?;
                constructor(view.settings())
            }
        }
    }
}

/// Registry mapping factory names to factory implementations.
///
/// The broker consults it on every `create_resource` call; an unknown
/// factory name is a [`BrokerError::NotConfigured`].
pub struct FactoryRegistry<S: ScopeType, C: ResourceStore> {
    factories: BTreeMap<String, Arc<dyn SharedResourceFactory<S, C>>>,
}

impl<S: ScopeType, C: ResourceStore> FactoryRegistry<S, C> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Create a registry with the reference limiter factory registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SharedLimiterFactory::new()));
        registry
    }

    /// Register a factory under its own name.
    pub fn register(&mut self, factory: Arc<dyn SharedResourceFactory<S, C>>) {
        self.factories.insert(factory.name().to_string(), factory);
    }

    /// Look up a factory by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn SharedResourceFactory<S, C>>> {
        self.factories.get(name)
    }
}

impl<S: ScopeType, C: ResourceStore> Default for FactoryRegistry<S, C> {
    fn default() -> Self {
        Self::with_defaults()
    }
}
