//! The background periodic task named as an external collaborator in
//! SPEC_FULL §1/§5: drains the manager's hot set on a fixed interval and
//! flushes every name it finds, exactly as any other caller of the
//! manager's public API would.
//!
//! Runs on its own OS thread rather than as an async task, matching the
//! manager's own synchronous, thread-blocking design (§5): there is no
//! cooperative scheduler to yield to here.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use bloomd_manager::{Error, FilterManager};

pub struct Flusher {
    stop: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl Flusher {
    pub fn spawn(manager: Arc<FilterManager>, interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let handle = std::thread::Builder::new()
            .name("bloomd-flusher".into())
            .spawn(move || run(manager, interval, stop_flag))
            .expect("failed to spawn background flusher thread");

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signals the loop to exit and waits for the thread to join. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(manager: Arc<FilterManager>, interval: Duration, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Acquire) {
        std::thread::sleep(interval);
        if stop.load(Ordering::Acquire) {
            break;
        }
        for name in manager.drain_hot() {
            match manager.flush(&name) {
                Ok(()) => tracing::debug!("flushed hot filter {name:?}"),
                // The filter may have been dropped between being marked hot
                // and this drain; that is not this thread's problem.
                Err(Error::NoSuchFilter { .. }) => {}
                Err(e) => tracing::warn!("failed to flush {name:?}: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloomd_manager::Config;
    use std::sync::Arc as StdArc;

    #[test]
    fn drains_and_flushes_hot_filters() {
        let manager = StdArc::new(FilterManager::new(
            Config {
                data_dir: "/nonexistent/bloomd-flusher-test".into(),
                ..Config::default()
            },
            StdArc::new(bloomd_filter::LocalDiskFilterBackend::new(
                "/nonexistent/bloomd-flusher-test",
            )),
        ));
        manager
            .create(
                "hot",
                Some(bloomd_manager::FilterParams {
                    in_memory: true,
                    ..Default::default()
                }),
            )
            .unwrap();
        manager.check("hot", &[b"a".to_vec()]).unwrap();

        let mut flusher = Flusher::spawn(manager.clone(), Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(80));
        flusher.stop();

        // The flusher's own drain should have already emptied the hot set.
        assert!(manager.drain_hot().is_empty());
    }
}
