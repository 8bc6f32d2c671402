use thiserror::Error;

use crate::filter::FilterError;

/// Errors surfaced by the filter manager to its direct caller.
///
/// None of these are swallowed: every failed operation returns one of these
/// variants. Discovery-time and destruction-time failures are logged instead
/// (see `discovery` and `manager::FilterManager::release`) because they have
/// no caller to report to.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no such filter {name:?}")]
    NoSuchFilter { name: String },

    #[error("filter {name:?} already exists")]
    AlreadyExists { name: String },

    #[error("failed to create filter {name:?}")]
    CreateFailed {
        name: String,
        #[source]
        source: FilterError,
    },

    #[error("internal error: {0}")]
    Internal(String),
}
