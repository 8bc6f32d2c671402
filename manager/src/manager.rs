use std::sync::{Arc, Mutex};

use crate::{
    config::{Config, FilterParams},
    discovery,
    error::Error,
    filter::FilterBackend,
    handle::Handle,
    hotset::HotSet,
    registry::Registry,
};

/// The filter manager: registry, hot set, create serializer and discovery,
/// wired around one [`FilterBackend`].
///
/// Every public method here blocks its caller on lock acquisition or
/// underlying-filter I/O; there is no cooperative scheduler in this layer
/// (§5). The lock acquisition order enforced by the methods below is:
/// create serializer -> registry lock -> handle reader/writer lock -> hot
/// lock.
pub struct FilterManager {
    config: Config,
    backend: Arc<dyn FilterBackend>,
    registry: Registry,
    hot: HotSet,
    /// Held only around `create`; distinct from the registry lock so slow
    /// underlying initialization never blocks lookups or returns (§4.5).
    create_lock: Mutex<()>,
}

impl FilterManager {
    /// Constructs a manager and runs startup discovery (§4.8) before
    /// returning. No concurrent caller may be admitted until this returns.
    pub fn new(config: Config, backend: Arc<dyn FilterBackend>) -> Self {
        let registry = Registry::new();
        for (name, handle) in discovery::discover(&config, backend.as_ref()) {
            registry.insert(name, handle);
        }

        Self {
            config,
            backend,
            registry,
            hot: HotSet::new(),
            create_lock: Mutex::new(()),
        }
    }

    pub fn num_filters(&self) -> usize {
        self.registry.len()
    }

    /// Drains the hot set for an external periodic flusher (§6's drain
    /// contract). Calling this is the only way names are ever removed from
    /// the hot set.
    pub fn drain_hot(&self) -> std::collections::HashSet<String> {
        self.hot.drain()
    }

    /// `create(name, override)` — §4.5.
    pub fn create(&self, name: &str, params_override: Option<FilterParams>) -> Result<(), Error> {
        let _serial = self.create_lock.lock().unwrap_or_else(|p| p.into_inner());

        if self.registry.contains(name) {
            return Err(Error::AlreadyExists { name: name.into() });
        }

        let effective = params_override.unwrap_or_else(|| self.config.default_filter.clone());
        let filter =
            self.backend
                .init(name, &effective, true)
                .map_err(|source| Error::CreateFailed {
                    name: name.into(),
                    source,
                })?;

        self.registry
            .insert(name.to_string(), Arc::new(Handle::new(filter)));
        Ok(())
    }

    /// `drop(name)` — §4.6. Marks the filter inactive and contributes the
    /// extra reference decrement; destruction happens once all in-flight
    /// operations have returned their own reference.
    pub fn drop_filter(&self, name: &str) -> Result<(), Error> {
        let handle = self.take(name)?;
        self.registry.deactivate(name);
        drop(handle);
        self.release(name);
        Ok(())
    }

    /// `flush(name)` — §4.3. Read-mode: flush serializes through the
    /// underlying filter's own write discipline without mutating anything
    /// externally observable.
    pub fn flush(&self, name: &str) -> Result<(), Error> {
        let handle = self.take(name)?;
        let result = {
            let _guard = handle.rwlock.read().unwrap_or_else(|p| p.into_inner());
            handle.filter.flush()
        };
        self.hot.mark(name);
        self.release(name);
        result.map_err(|e| Error::Internal(format!("flush {name:?} failed: {e}")))
    }

    /// `unmap(name)` — §4.4. Releases in-memory buffers; the filter stays
    /// registered and active, and re-opens lazily on next use.
    pub fn unmap(&self, name: &str) -> Result<(), Error> {
        let handle = self.take(name)?;
        let result = {
            let _guard = handle.rwlock.write().unwrap_or_else(|p| p.into_inner());
            handle.filter.close()
        };
        self.release(name);
        result.map_err(|e| Error::Internal(format!("unmap {name:?} failed: {e}")))
    }

    /// `check(name, keys)` — §4.2, reader mode.
    pub fn check(&self, name: &str, keys: &[Vec<u8>]) -> Result<Vec<bool>, Error> {
        let handle = self.take(name)?;
        let out = {
            let _guard = handle.rwlock.read().unwrap_or_else(|p| p.into_inner());
            keys.iter().map(|k| handle.filter.contains(k)).collect()
        };
        self.hot.mark(name);
        self.release(name);
        Ok(out)
    }

    /// `set(name, keys)` — §4.2, writer mode.
    pub fn set(&self, name: &str, keys: &[Vec<u8>]) -> Result<Vec<bool>, Error> {
        let handle = self.take(name)?;
        let out = {
            let _guard = handle.rwlock.write().unwrap_or_else(|p| p.into_inner());
            keys.iter().map(|k| handle.filter.add(k)).collect()
        };
        self.hot.mark(name);
        self.release(name);
        Ok(out)
    }

    /// Iterates the registry, closing and destroying every filter, and
    /// drops both mappings (§4.9). Assumes every external caller has
    /// already quiesced; any surviving reference is a bug.
    pub fn shutdown(&self) {
        for handle in self.registry.drain() {
            if let Err(e) = handle.filter.close() {
                tracing::warn!("failed to close filter during shutdown: {e}");
            }
            if let Err(e) = handle.filter.destroy() {
                tracing::warn!("failed to destroy filter during shutdown: {e}");
            }
        }
    }

    fn take(&self, name: &str) -> Result<Arc<Handle>, Error> {
        self.registry
            .take(name)
            .ok_or_else(|| Error::NoSuchFilter { name: name.into() })
    }

    /// `return(name)` — §4.1. Any I/O triggered by destruction happens
    /// after the registry lock is released.
    fn release(&self, name: &str) {
        let Some(handle) = self.registry.return_ref(name) else {
            return;
        };
        if let Err(e) = handle.filter.close() {
            tracing::warn!("failed to close filter {name:?} during destruction: {e}");
        }
        if let Err(e) = handle.filter.destroy() {
            tracing::warn!("failed to destroy filter {name:?}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Filter, Result as FilterResult};
    use std::{
        collections::HashSet,
        sync::{
            Mutex as StdMutex,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
    };

    struct MemFilter {
        keys: StdMutex<HashSet<Vec<u8>>>,
        closed: AtomicBool,
    }

    impl Filter for MemFilter {
        fn contains(&self, key: &[u8]) -> bool {
            self.keys.lock().unwrap().contains(key)
        }
        fn add(&self, key: &[u8]) -> bool {
            self.keys.lock().unwrap().insert(key.to_vec())
        }
        fn flush(&self) -> FilterResult<()> {
            Ok(())
        }
        fn close(&self) -> FilterResult<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
        fn destroy(&self) -> FilterResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemBackend {
        init_count: AtomicUsize,
        fail_next: AtomicBool,
    }

    impl FilterBackend for MemBackend {
        fn init(
            &self,
            _name: &str,
            _params: &FilterParams,
            _create_if_absent: bool,
        ) -> FilterResult<Arc<dyn Filter>> {
            self.init_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err("simulated init failure".into());
            }
            Ok(Arc::new(MemFilter {
                keys: StdMutex::new(HashSet::new()),
                closed: AtomicBool::new(false),
            }))
        }
    }

    /// `MemBackend` never touches the filesystem, so discovery simply finds
    /// a missing directory, logs it, and starts with an empty registry —
    /// exactly the boundary behavior described in §8.
    fn manager() -> FilterManager {
        FilterManager::new(
            Config {
                data_dir: "/nonexistent/bloomd-manager-test".into(),
                ..Config::default()
            },
            Arc::new(MemBackend::default()),
        )
    }

    fn keys(words: &[&str]) -> Vec<Vec<u8>> {
        words.iter().map(|w| w.as_bytes().to_vec()).collect()
    }

    #[test]
    fn create_set_check_drop() {
        let mgr = manager();
        mgr.create("users", None).unwrap();
        assert_eq!(
            mgr.set("users", &keys(&["alice", "bob"])).unwrap(),
            vec![true, true]
        );
        assert_eq!(
            mgr.check("users", &keys(&["alice", "carol"])).unwrap(),
            vec![true, false]
        );
        mgr.drop_filter("users").unwrap();
        assert!(matches!(
            mgr.check("users", &keys(&["alice"])),
            Err(Error::NoSuchFilter { .. })
        ));
    }

    #[test]
    fn double_create() {
        let mgr = manager();
        mgr.create("a", None).unwrap();
        assert!(matches!(
            mgr.create("a", None),
            Err(Error::AlreadyExists { .. })
        ));
        assert_eq!(mgr.num_filters(), 1);
    }

    #[test]
    fn unmap_then_access() {
        let mgr = manager();
        mgr.create("y", None).unwrap();
        mgr.set("y", &keys(&["p"])).unwrap();
        mgr.unmap("y").unwrap();
        assert_eq!(mgr.check("y", &keys(&["p"])).unwrap(), vec![true]);
        assert_eq!(mgr.num_filters(), 1);
    }

    #[test]
    fn empty_batch_succeeds() {
        let mgr = manager();
        mgr.create("z", None).unwrap();
        assert!(mgr.check("z", &[]).unwrap().is_empty());
        assert!(mgr.set("z", &[]).unwrap().is_empty());
    }

    #[test]
    fn create_failed_leaves_no_handle() {
        let backend = Arc::new(MemBackend::default());
        backend.fail_next.store(true, Ordering::SeqCst);
        let mgr = FilterManager::new(
            Config {
                data_dir: "/nonexistent/bloomd-manager-test".into(),
                ..Config::default()
            },
            backend,
        );
        assert!(matches!(
            mgr.create("broken", None),
            Err(Error::CreateFailed { .. })
        ));
        assert_eq!(mgr.num_filters(), 0);
    }

    #[test]
    fn flush_is_read_mode_and_idempotent() {
        let mgr = manager();
        mgr.create("z", None).unwrap();
        mgr.flush("z").unwrap();
        mgr.flush("z").unwrap();
    }

    #[test]
    fn drop_concurrent_with_in_flight_batch_completes_then_destroys() {
        use std::sync::Barrier;

        let mgr = Arc::new(manager());
        mgr.create("x", None).unwrap();

        let many_keys: Vec<Vec<u8>> = (0..1000u32).map(|i| i.to_be_bytes().to_vec()).collect();
        let barrier = Arc::new(Barrier::new(2));

        let mgr_a = mgr.clone();
        let barrier_a = barrier.clone();
        let keys_a = many_keys.clone();
        let writer = std::thread::spawn(move || {
            barrier_a.wait();
            mgr_a.set("x", &keys_a).unwrap()
        });

        let mgr_b = mgr.clone();
        let barrier_b = barrier.clone();
        let dropper = std::thread::spawn(move || {
            barrier_b.wait();
            mgr_b.drop_filter("x")
        });

        let set_result = writer.join().unwrap();
        assert!(set_result.iter().all(|newly_added| *newly_added));

        dropper.join().unwrap().unwrap();
        assert!(matches!(
            mgr.check("x", &keys(&["0"])),
            Err(Error::NoSuchFilter { .. })
        ));
    }

    #[test]
    fn high_contention_readers_do_not_deadlock() {
        let mgr = Arc::new(manager());
        mgr.create("z", None).unwrap();
        mgr.set("z", &keys(&["seed"])).unwrap();

        let mut threads = Vec::new();
        for _ in 0..16 {
            let mgr = mgr.clone();
            threads.push(std::thread::spawn(move || {
                for _ in 0..200 {
                    let out = mgr.check("z", &keys(&["seed", "other"])).unwrap();
                    assert_eq!(out.len(), 2);
                }
            }));
        }
        for _ in 0..4 {
            mgr.flush("z").unwrap();
        }
        for t in threads {
            t.join().unwrap();
        }
    }
}
