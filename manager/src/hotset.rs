use std::collections::HashSet;

use bloomd_sync::spin;

/// Keys-only set of filter names touched since the last drain.
///
/// Consumed by an external periodic flusher (§6): the manager only ever
/// adds to it. `drain` atomically swaps in an empty set, matching the
/// consumer contract.
pub(crate) struct HotSet {
    inner: spin::Mutex<HashSet<String>>,
}

impl HotSet {
    pub(crate) fn new() -> Self {
        Self {
            inner: spin::Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn mark(&self, name: &str) {
        let mut set = self.inner.lock();
        if !set.contains(name) {
            set.insert(name.to_string());
        }
    }

    pub(crate) fn drain(&self) -> HashSet<String> {
        std::mem::take(&mut *self.inner.lock())
    }
}
