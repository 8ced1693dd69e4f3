//! Scope types and named scope instances.
//!
//! A scope type is a level in the sharing hierarchy (e.g. global vs. local);
//! a scope instance is a named occurrence of a scope type. Brokers form a
//! rooted tree of scope instances: the root type has exactly one canonical
//! instance, every other type is instantiated per named child broker.

use std::fmt;
use std::hash::Hash;

/// A level in the scope hierarchy.
///
/// Implementations are small `Copy` values, typically a plain enum. The
/// total order runs from broadest (least) to narrowest (greatest); the
/// broker relies on it to order composite components and to validate that
/// child brokers are strictly narrower than their parents.
///
/// # Example
/// ```
/// use scoped_broker::{ScopeType, SimpleScopeType};
///
/// assert!(SimpleScopeType::Global < SimpleScopeType::Local);
/// assert_eq!(SimpleScopeType::root(), SimpleScopeType::Global);
/// assert_eq!(SimpleScopeType::Local.name(), "local");
/// ```
pub trait ScopeType:
    Copy + Eq + Ord + Hash + fmt::Debug + Send + Sync + 'static
{
    /// Token identifying this scope type in configuration keys.
    fn name(&self) -> &'static str;

    /// The unique root scope type (broadest level, no parent).
    fn root() -> Self;

    /// All known scope types, broadest first.
    fn all() -> &'static [Self];

    /// Check whether this is the root scope type.
    fn is_root(&self) -> bool {
        *self == Self::root()
    }
}

/// A minimal two-level hierarchy: one global root scope and named local
/// child scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SimpleScopeType {
    /// The root scope; shared process-wide.
    Global,
    /// A named child scope.
    Local,
}

impl ScopeType for SimpleScopeType {
    fn name(&self) -> &'static str {
        match self {
            SimpleScopeType::Global => "global",
            SimpleScopeType::Local => "local",
        }
    }

    fn root() -> Self {
        SimpleScopeType::Global
    }

    fn all() -> &'static [Self] {
        &[SimpleScopeType::Global, SimpleScopeType::Local]
    }
}

impl fmt::Display for SimpleScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named occurrence of a scope type.
///
/// Two subtrees anchored at the same instance share the resources cached at
/// that instance; subtrees anchored at differently named instances of the
/// same type do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeInstance<S: ScopeType> {
    scope_type: S,
    name: String,
}

impl<S: ScopeType> ScopeInstance<S> {
    /// Create a named instance of a scope type.
    pub fn new(scope_type: S, name: impl Into<String>) -> Self {
        Self {
            scope_type,
            name: name.into(),
        }
    }

    /// The canonical instance of the root scope type.
    ///
    /// There is exactly one root instance process-wide; its name is the
    /// root type's own name.
    pub fn root() -> Self {
        let root = S::root();
        Self {
            scope_type: root,
            name: root.name().to_string(),
        }
    }

    /// The scope type of this instance.
    pub fn scope_type(&self) -> S {
        self.scope_type
    }

    /// The instance name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<S: ScopeType> fmt::Display for ScopeInstance<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scope_type.name(), self.name)
    }
}
