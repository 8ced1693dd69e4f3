//! Infrastructure layer - adapters implementing the application ports.
//!
//! This layer provides adapters for:
//! - Configuration sources (in-memory map)
//! - Singleton caches (sharded concurrent map)
//! - Default top-level wiring

pub mod bootstrap;
pub mod cache;
pub mod config;
