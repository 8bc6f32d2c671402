use std::{num::NonZeroU64, path::PathBuf};

/// Parameters passed to [`crate::filter::FilterBackend::init`].
///
/// This layer treats these fields as opaque beyond construction: it never
/// inspects or validates them, it only chooses between the manager default
/// and a caller-supplied override at `create` time (§4.5).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FilterParams {
    /// Expected number of distinct keys the filter should be sized for.
    pub capacity: NonZeroU64,
    /// Target false-positive probability in `(0, 1)`.
    pub false_positive_rate: f64,
    /// Whether the filter's bit array ever touches disk.
    pub in_memory: bool,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            capacity: NonZeroU64::new(1_000_000).unwrap(),
            false_positive_rate: 0.001,
            in_memory: false,
        }
    }
}

/// Manager-wide configuration, set at construction and never mutated.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Directory scanned by discovery and under which new filters are created.
    pub data_dir: PathBuf,
    /// Default parameter set used when `create` receives no override.
    pub default_filter: FilterParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            default_filter: FilterParams::default(),
        }
    }
}
