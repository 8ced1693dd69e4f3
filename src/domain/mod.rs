//! Domain layer - pure business logic with no external dependencies.
//!
//! This layer contains the core concepts and invariants of the broker:
//! - Scope types and named scope instances
//! - Resource keys (scope-independent resource identity)
//! - Limiter implementations (no-op, count-based, composite)
//!
//! All types in this layer are pure and easily testable.

pub mod key;
pub mod limiter;
pub mod scope;
