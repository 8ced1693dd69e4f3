//! Default wiring for a broker tree.

use crate::application::broker::SharedResourcesBroker;
use crate::application::error::BrokerError;
use crate::application::factory::FactoryRegistry;
use crate::application::ports::ConfigSource;
use crate::domain::scope::{ScopeInstance, ScopeType, SimpleScopeType};
use crate::infrastructure::cache::ShardedCache;
use std::sync::Arc;

/// A broker over the two-level scope hierarchy with the default cache.
pub type DefaultBroker = SharedResourcesBroker<SimpleScopeType, ShardedCache>;

/// Build the root of a broker tree from a raw configuration store.
///
/// Wires the sharded singleton cache and the default factory registry (the
/// reference limiter factory). `root_instance` must be an instance of the
/// root scope type.
///
/// # Example
/// ```
/// use scoped_broker::{
///     create_default_top_level_broker, MapConfigSource, ResourceKey, ScopeInstance,
///     SimpleScopeType,
/// };
/// use std::sync::Arc;
///
/// let config = MapConfigSource::new();
/// let broker = create_default_top_level_broker::<SimpleScopeType>(
///     Arc::new(config),
///     ScopeInstance::root(),
/// )
/// .unwrap();
///
/// let limiter = broker
///     .create_resource(&ResourceKey::new("resource"), "limiter")
///     .unwrap();
/// assert!(limiter.try_acquire(1));
/// ```
pub fn create_default_top_level_broker<S: ScopeType>(
    config: Arc<dyn ConfigSource>,
    root_instance: ScopeInstance<S>,
) -> Result<SharedResourcesBroker<S, ShardedCache>, BrokerError> {
    SharedResourcesBroker::top_level(
        config,
        Arc::new(FactoryRegistry::with_defaults()),
        root_instance,
        ShardedCache::new(),
    )
}
