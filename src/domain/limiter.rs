//! Limiter implementations shared through the broker.
//!
//! This module defines the core trait for admission-controlled resources and
//! the reference implementations: a no-op variant, a count-based variant,
//! and the composite that enforces several scope levels conjunctively.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A shared, thread-safe limiter handle.
pub type SharedLimiter = Arc<dyn Limiter>;

/// Trait for admission-controlled resources.
///
/// Implementations are shared across threads behind an `Arc`, so acquisition
/// takes `&self` and keeps its own state with interior mutability.
pub trait Limiter: Send + Sync + fmt::Debug {
    /// Try to acquire `permits` units of work.
    ///
    /// Returns `true` if the permits were granted. A refusal must leave the
    /// limiter's state unchanged.
    fn try_acquire(&self, permits: u64) -> bool;

    /// Return previously granted permits.
    ///
    /// This is the symmetric undo for [`try_acquire`](Limiter::try_acquire);
    /// the composite limiter uses it to roll back partially granted work
    /// when a later component refuses.
    fn release(&self, permits: u64);

    /// Access the concrete type for checked downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Limiter that grants every request.
///
/// Built when no `limiterClass` selector is configured for a resource; by
/// default it is anchored at the root scope and shared tree-wide.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLimiter;

impl NoopLimiter {
    /// Create a no-op limiter.
    pub fn new() -> Self {
        Self
    }
}

impl Limiter for NoopLimiter {
    fn try_acquire(&self, _permits: u64) -> bool {
        true
    }

    fn release(&self, _permits: u64) {}

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Limiter with a fixed budget of permits.
///
/// Grants requests until the budget is exhausted, then refuses. Released
/// permits are returned to the budget, clamped at the original limit.
///
/// # Example
/// ```
/// use scoped_broker::{CountBasedLimiter, Limiter};
///
/// let limiter = CountBasedLimiter::new(2);
/// assert!(limiter.try_acquire(1));
/// assert!(limiter.try_acquire(1));
/// assert!(!limiter.try_acquire(1));
///
/// limiter.release(1);
/// assert!(limiter.try_acquire(1));
/// ```
#[derive(Debug)]
pub struct CountBasedLimiter {
    limit: u64,
    remaining: AtomicU64,
}

impl CountBasedLimiter {
    /// Create a limiter with a fixed permit budget.
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            remaining: AtomicU64::new(limit),
        }
    }

    /// The configured budget.
    pub fn count_limit(&self) -> u64 {
        self.limit
    }

    /// Permits currently available.
    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::Acquire)
    }
}

impl Limiter for CountBasedLimiter {
    fn try_acquire(&self, permits: u64) -> bool {
        let mut current = self.remaining.load(Ordering::Acquire);
        loop {
            if current < permits {
                return false;
            }
            match self.remaining.compare_exchange_weak(
                current,
                current - permits,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    fn release(&self, permits: u64) {
        let mut current = self.remaining.load(Ordering::Acquire);
        loop {
            let restored = current.saturating_add(permits).min(self.limit);
            match self.remaining.compare_exchange_weak(
                current,
                restored,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Composite limiter enforcing every underlying limiter conjunctively.
///
/// Components are ordered narrowest scope first, broadest scope last. An
/// acquisition succeeds only if every component grants it; when a component
/// refuses, the permits already granted by earlier components are released
/// in reverse order, so no component's state reflects work that was
/// ultimately not admitted.
#[derive(Debug)]
pub struct MultiLimiter {
    underlying: Vec<SharedLimiter>,
}

impl MultiLimiter {
    /// Create a composite from ordered underlying limiters.
    pub fn new(underlying: Vec<SharedLimiter>) -> Self {
        Self { underlying }
    }

    /// The underlying limiters, narrowest scope first.
    pub fn underlying(&self) -> &[SharedLimiter] {
        &self.underlying
    }
}

impl Limiter for MultiLimiter {
    fn try_acquire(&self, permits: u64) -> bool {
        for (index, limiter) in self.underlying.iter().enumerate() {
            if !limiter.try_acquire(permits) {
                // Roll back the already-granted prefix.
                for granted in self.underlying[..index].iter().rev() {
                    granted.release(permits);
                }
                return false;
            }
        }
        true
    }

    fn release(&self, permits: u64) {
        for limiter in self.underlying.iter().rev() {
            limiter.release(permits);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_always_grants() {
        let limiter = NoopLimiter::new();
        for _ in 0..1000 {
            assert!(limiter.try_acquire(u64::MAX));
        }
        limiter.release(1);
    }

    #[test]
    fn test_count_based_exhaustion() {
        let limiter = CountBasedLimiter::new(3);
        assert_eq!(limiter.count_limit(), 3);

        assert!(limiter.try_acquire(1));
        assert!(limiter.try_acquire(2));
        assert!(!limiter.try_acquire(1));
        assert_eq!(limiter.remaining(), 0);
    }

    #[test]
    fn test_count_based_zero_limit() {
        let limiter = CountBasedLimiter::new(0);
        assert!(!limiter.try_acquire(1));
        // Zero-permit acquisitions are trivially granted.
        assert!(limiter.try_acquire(0));
    }

    #[test]
    fn test_count_based_refusal_leaves_state_unchanged() {
        let limiter = CountBasedLimiter::new(5);
        assert!(limiter.try_acquire(3));
        assert!(!limiter.try_acquire(3));
        assert_eq!(limiter.remaining(), 2);
    }

    #[test]
    fn test_count_based_release_clamps_at_limit() {
        let limiter = CountBasedLimiter::new(5);
        assert!(limiter.try_acquire(2));
        limiter.release(100);
        assert_eq!(limiter.remaining(), 5);
    }

    #[test]
    fn test_count_based_concurrent_acquisition() {
        use std::thread;

        let limiter = Arc::new(CountBasedLimiter::new(50));
        let mut handles = vec![];

        for _ in 0..10 {
            let limiter = Arc::clone(&limiter);
            handles.push(thread::spawn(move || {
                let mut granted = 0;
                for _ in 0..20 {
                    if limiter.try_acquire(1) {
                        granted += 1;
                    }
                }
                granted
            }));
        }

        let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 50);
        assert_eq!(limiter.remaining(), 0);
    }

    #[test]
    fn test_multi_limiter_grants_when_all_grant() {
        let a = Arc::new(CountBasedLimiter::new(5));
        let b = Arc::new(CountBasedLimiter::new(10));
        let multi = MultiLimiter::new(vec![a.clone(), b.clone()]);

        assert!(multi.try_acquire(5));
        assert_eq!(a.remaining(), 0);
        assert_eq!(b.remaining(), 5);
    }

    #[test]
    fn test_multi_limiter_rolls_back_on_refusal() {
        let a = Arc::new(CountBasedLimiter::new(10));
        let b = Arc::new(CountBasedLimiter::new(3));
        let multi = MultiLimiter::new(vec![a.clone(), b.clone()]);

        // b refuses; a's grant must be rolled back.
        assert!(!multi.try_acquire(5));
        assert_eq!(a.remaining(), 10);
        assert_eq!(b.remaining(), 3);

        // A smaller request still goes through afterwards.
        assert!(multi.try_acquire(3));
        assert_eq!(a.remaining(), 7);
        assert_eq!(b.remaining(), 0);
    }

    #[test]
    fn test_multi_limiter_rollback_is_reverse_ordered() {
        let first = Arc::new(CountBasedLimiter::new(4));
        let second = Arc::new(CountBasedLimiter::new(4));
        let refusing = Arc::new(CountBasedLimiter::new(0));
        let multi = MultiLimiter::new(vec![first.clone(), second.clone(), refusing]);

        assert!(!multi.try_acquire(2));
        assert_eq!(first.remaining(), 4);
        assert_eq!(second.remaining(), 4);
    }

    #[test]
    fn test_multi_limiter_release_propagates() {
        let a = Arc::new(CountBasedLimiter::new(5));
        let b = Arc::new(CountBasedLimiter::new(5));
        let multi = MultiLimiter::new(vec![a.clone(), b.clone()]);

        assert!(multi.try_acquire(4));
        multi.release(4);
        assert_eq!(a.remaining(), 5);
        assert_eq!(b.remaining(), 5);
    }

    #[test]
    fn test_multi_limiter_empty_grants() {
        let multi = MultiLimiter::new(vec![]);
        assert!(multi.try_acquire(1));
    }

    #[test]
    fn test_downcast_through_trait_object() {
        let limiter: SharedLimiter = Arc::new(CountBasedLimiter::new(7));
        let concrete = limiter
            .as_any()
            .downcast_ref::<CountBasedLimiter>()
            .unwrap();
        assert_eq!(concrete.count_limit(), 7);
        assert!(limiter.as_any().downcast_ref::<NoopLimiter>().is_none());
    }
}
