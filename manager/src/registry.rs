use std::{collections::HashMap, sync::Arc};

use bloomd_sync::spin;

use crate::handle::Handle;

/// Name-to-handle mapping, guarded by a short-critical-section spinlock.
///
/// Every method here does O(1) pointer/counter work under the lock and
/// never performs I/O or calls into the underlying filter while holding it.
pub(crate) struct Registry {
    inner: spin::Mutex<HashMap<String, Arc<Handle>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            inner: spin::Mutex::new(HashMap::new()),
        }
    }

    /// Race-free existence probe that does not touch `ref_count` or
    /// `is_active` (§4.5 step 2) — used only under the create serializer.
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.inner.lock().contains_key(name)
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// `take(name)`: look up, reject if absent or inactive, else bump the
    /// reference count and hand back the shared handle (§4.1).
    pub(crate) fn take(&self, name: &str) -> Option<Arc<Handle>> {
        let map = self.inner.lock();
        let handle = map.get(name)?;
        if !handle.is_active() {
            return None;
        }
        handle.incr_ref();
        Some(handle.clone())
    }

    pub(crate) fn insert(&self, name: String, handle: Arc<Handle>) {
        self.inner.lock().insert(name, handle);
    }

    /// Sets `is_active = false` and contributes the drop's extra decrement
    /// (§4.6). The caller must already hold a reference (from its own
    /// `take`), so `ref_count` cannot reach zero here.
    pub(crate) fn deactivate(&self, name: &str) {
        let map = self.inner.lock();
        if let Some(handle) = map.get(name) {
            handle.deactivate();
            handle.decr_ref();
        }
    }

    /// `return(name)`: decrement the reference count; if it reaches zero,
    /// unlink the handle from the map and hand it back so the caller can
    /// destroy it outside the lock (§4.1).
    ///
    /// A missing `name` means the caller dropped a reference it never held
    /// — a programming error, not a data race. Per §9's resolution of the
    /// source's uninitialized `delete` flag, this is logged and no
    /// destruction is attempted.
    pub(crate) fn return_ref(&self, name: &str) -> Option<Arc<Handle>> {
        let mut map = self.inner.lock();
        let Some(handle) = map.get(name).cloned() else {
            tracing::error!(
                target: "bloomd_manager::registry",
                "return_ref called for unknown filter {name:?}; caller did not hold a reference"
            );
            return None;
        };
        if handle.decr_ref() <= 0 {
            map.remove(name);
            Some(handle)
        } else {
            None
        }
    }

    /// Drains the whole registry for teardown (§4.9). Not safe to call
    /// while any caller might still be operating on a filter.
    pub(crate) fn drain(&self) -> Vec<Arc<Handle>> {
        self.inner.lock().drain().map(|(_, h)| h).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;

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
    fn take_return_destroys_on_last_reference() {
        let registry = Registry::new();
        registry.insert("users".into(), Arc::new(Handle::new(Arc::new(Noop))));

        // Two outstanding operations plus the registry's own reference.
        let _h1 = registry.take("users").expect("present");
        let _h2 = registry.take("users").expect("present");
        assert!(registry.return_ref("users").is_none(), "still 2 refs left");
        assert!(registry.return_ref("users").is_none(), "still 1 ref left");
        assert!(
            registry.return_ref("users").is_some(),
            "last reference should trigger destruction"
        );
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn drop_then_drain_destroys_exactly_once() {
        let registry = Registry::new();
        registry.insert("users".into(), Arc::new(Handle::new(Arc::new(Noop))));

        let handle = registry.take("users").expect("present");
        registry.deactivate("users");
        assert!(registry.take("users").is_none(), "inactive, take fails");
        let destroyed = registry.return_ref("users");
        assert!(destroyed.is_some());
        drop(handle);
    }

    #[test]
    fn take_after_deactivate_fails() {
        let registry = Registry::new();
        registry.insert("users".into(), Arc::new(Handle::new(Arc::new(Noop))));
        registry.deactivate("users");
        assert!(registry.take("users").is_none());
    }

    #[test]
    fn return_unknown_name_does_not_panic() {
        let registry = Registry::new();
        assert!(registry.return_ref("ghost").is_none());
    }
}
