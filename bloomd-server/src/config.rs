//! Command-line and file/environment configuration loading, in the style of
//! `bpa-server`'s `config`/`settings` modules: a `getopts` cmdline layer on
//! top of the `config` crate, with `BLOOMD_*` environment variables and an
//! optional config file, producing a [`bloomd_manager::Config`] plus the
//! handful of settings this binary alone cares about (log level, flush
//! interval).

use std::path::PathBuf;
use tracing::Level;

use bloomd_manager::{Config as ManagerConfig, FilterParams};

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory scanned by discovery and under which new filters are created.
    pub data_dir: PathBuf,
    /// Default parameter set used when `create` receives no override.
    pub default_filter: FilterParams,
    /// Interval between hot-set drain/flush passes run by the background
    /// flusher thread (SPEC_FULL §5).
    pub flush_interval_secs: u64,
    #[serde(with = "log_level_serde")]
    pub log_level: Option<Level>,
}

impl Default for Settings {
    fn default() -> Self {
        let manager_default = ManagerConfig::default();
        Self {
            data_dir: manager_default.data_dir,
            default_filter: manager_default.default_filter,
            flush_interval_secs: 60,
            log_level: None,
        }
    }
}

impl Settings {
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            data_dir: self.data_dir.clone(),
            default_filter: self.default_filter.clone(),
        }
    }
}

mod log_level_serde {
    use super::Level;
    use serde::{Deserialize, Deserializer};
    use std::str::FromStr;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Level>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| Level::from_str(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

fn options() -> getopts::Options {
    let mut opts = getopts::Options::new();
    opts.optflag("h", "help", "print this help menu")
        .optflag("v", "version", "print the version information")
        .optopt("c", "config", "use a custom configuration file", "FILE")
        .optopt("d", "data-dir", "override the filter data directory", "DIR");
    opts
}

pub fn config_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", env!("CARGO_PKG_NAME")).map_or_else(
        || std::path::Path::new("/etc").join(env!("CARGO_PKG_NAME")),
        |proj_dirs| proj_dirs.config_local_dir().to_path_buf(),
    )
}

/// Parses argv and layered configuration sources. Returns `None` when the
/// caller asked for `--help`/`--version` and the program should exit
/// without starting.
pub fn init() -> Option<(Settings, String)> {
    let opts = options();
    let args: Vec<String> = std::env::args().collect();
    let flags = opts
        .parse(&args[1..])
        .expect("failed to parse command line arguments");

    if flags.opt_present("h") {
        let brief = format!(
            "{} {} - {}\n\nUsage: {} [options]",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_DESCRIPTION"),
            args[0]
        );
        print!("{}", opts.usage(&brief));
        return None;
    }
    if flags.opt_present("v") {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return None;
    }

    let mut builder = ::config::Config::builder();

    let source: String;
    if let Some(path) = flags.opt_str("config") {
        source = format!("using configuration file {path:?} given on the command line");
        builder = builder.add_source(::config::File::with_name(&path));
    } else if let Ok(path) = std::env::var("BLOOMD_CONFIG_FILE") {
        source = format!(
            "using configuration file {path:?} given by BLOOMD_CONFIG_FILE"
        );
        builder = builder.add_source(::config::File::with_name(&path));
    } else {
        let path = config_dir().join("bloomd.yaml");
        source = format!("using configuration file {} (if present)", path.display());
        builder = builder.add_source(::config::File::from(path).required(false));
    }

    builder = builder.add_source(::config::Environment::with_prefix("BLOOMD"));

    let mut settings: Settings = builder
        .build()
        .expect("failed to assemble configuration")
        .try_deserialize()
        .expect("failed to parse configuration");

    if let Some(data_dir) = flags.opt_str("data-dir") {
        settings.data_dir = data_dir.into();
    }

    Some((settings, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_manager_defaults() {
        let settings = Settings::default();
        let manager_default = ManagerConfig::default();
        assert_eq!(settings.data_dir, manager_default.data_dir);
        assert_eq!(settings.default_filter, manager_default.default_filter);
        assert_eq!(settings.flush_interval_secs, 60);
    }
}
