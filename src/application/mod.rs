//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Config view resolution (what one scope level sees)
//! - The resource factory protocol and implementation registries
//! - The broker tree with its per-node singleton caches
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod broker;
pub mod error;
pub mod factory;
pub mod ports;
pub mod resolver;
