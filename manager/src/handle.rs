use std::sync::{
    Arc, RwLock,
    atomic::{AtomicBool, AtomicI64, Ordering},
};

use crate::filter::Filter;

/// The unit of lifecycle: one underlying filter plus its concurrency and
/// reference-counting metadata.
///
/// `is_active` and `ref_count` are `Atomic*` purely so they can be mutated
/// through the shared `Arc<Handle>` the registry hands out; the *protocol*
/// that makes their transitions race-free is the registry lock held across
/// each multi-step `take`/`return`/`deactivate` sequence, not the atomics
/// themselves. `rwlock` is the only thing that protects `filter`, and is
/// never held across a registry-lock acquisition in either direction other
/// than the documented order: create serializer -> registry lock -> this
/// rwlock -> hot lock.
pub(crate) struct Handle {
    pub(crate) filter: Arc<dyn Filter>,
    is_active: AtomicBool,
    ref_count: AtomicI64,
    pub(crate) rwlock: RwLock<()>,
}

impl Handle {
    pub(crate) fn new(filter: Arc<dyn Filter>) -> Self {
        Self {
            filter,
            is_active: AtomicBool::new(true),
            ref_count: AtomicI64::new(1),
            rwlock: RwLock::new(()),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Acquire)
    }

    pub(crate) fn deactivate(&self) {
        self.is_active.store(false, Ordering::Release);
    }

    pub(crate) fn incr_ref(&self) {
        self.ref_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrements the reference count, returning the value *after* the
    /// decrement. A caller observing `<= 0` owns the destruction.
    pub(crate) fn decr_ref(&self) -> i64 {
        self.ref_count.fetch_sub(1, Ordering::AcqRel) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl Filter for Noop {
        fn contains(&self, _key: &[u8]) -> bool {
            false
        }
        fn add(&self, _key: &[u8]) -> bool {
            true
        }
        fn flush(&self) -> crate::filter::Result<()> {
            Ok(())
        }
        fn close(&self) -> crate::filter::Result<()> {
            Ok(())
        }
        fn destroy(&self) -> crate::filter::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn ref_counting() {
        let handle = Handle::new(Arc::new(Noop));
        assert!(handle.is_active());
        handle.incr_ref();
        assert_eq!(handle.decr_ref(), 1);
        assert_eq!(handle.decr_ref(), 0);
        handle.deactivate();
        assert!(!handle.is_active());
    }
}
