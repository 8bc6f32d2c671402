use std::sync::Arc;

use crate::{FILTER_DIR_PREFIX, config::Config, filter::FilterBackend, handle::Handle};

/// Scans `config.data_dir` for immediate children matching the
/// `bloomd.<name>` naming convention and returns the handles to seed the
/// registry with.
///
/// Runs once, before any concurrent caller is admitted (§4.8); that is why
/// this takes no lock of its own. A missing or unreadable data directory is
/// logged and yields an empty result rather than failing manager
/// construction; an individual filter that fails to initialize is logged
/// and skipped so one bad on-disk folder cannot prevent startup.
pub(crate) fn discover(config: &Config, backend: &dyn FilterBackend) -> Vec<(String, Arc<Handle>)> {
    let entries = match std::fs::read_dir(&config.data_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(
                "failed to scan data directory {:?} during discovery: {e}",
                config.data_dir
            );
            return Vec::new();
        }
    };

    let mut found = Vec::new();
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_dir() {
            continue;
        }

        let dir_name = entry.file_name();
        let Some(dir_name) = dir_name.to_str() else {
            continue;
        };
        if dir_name.len() < 8 || !dir_name.starts_with(FILTER_DIR_PREFIX) {
            continue;
        }
        let name = &dir_name[FILTER_DIR_PREFIX.len()..];

        match backend.init(name, &config.default_filter, true) {
            Ok(filter) => {
                tracing::info!("discovered filter {name:?}");
                found.push((name.to_string(), Arc::new(Handle::new(filter))));
            }
            Err(e) => {
                tracing::error!("failed to load discovered filter {name:?}: {e}; skipping");
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::FilterParams, filter::Filter};

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

    struct AlwaysOk;
    impl FilterBackend for AlwaysOk {
        fn init(
            &self,
            _name: &str,
            _params: &FilterParams,
            _create_if_absent: bool,
        ) -> crate::filter::Result<Arc<dyn Filter>> {
            Ok(Arc::new(Noop))
        }
    }

    #[test]
    fn finds_prefixed_directories_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("bloomd.u")).unwrap();
        std::fs::create_dir(dir.path().join("bloomd.v")).unwrap();
        std::fs::create_dir(dir.path().join("other")).unwrap();

        let config = Config {
            data_dir: dir.path().to_path_buf(),
            default_filter: FilterParams::default(),
        };
        let mut found = discover(&config, &AlwaysOk);
        found.sort_by(|a, b| a.0.cmp(&b.0));
        let names: Vec<_> = found.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["u", "v"]);
    }

    #[test]
    fn missing_data_dir_yields_empty() {
        let config = Config {
            data_dir: "/nonexistent/bloomd-discovery-test".into(),
            default_filter: FilterParams::default(),
        };
        assert!(discover(&config, &AlwaysOk).is_empty());
    }
}
