//! The seam between the manager and the probabilistic set-membership
//! collaborator (the actual Bloom filter).
//!
//! This module deliberately defines only the contract: `init`, `contains`,
//! `add`, `flush`, `close`, `destroy`. The bit layout, hash functions and
//! false-positive math belong to whatever implements [`Filter`] (see the
//! `bloomd-filter` crate for the one this service ships with), not to this
//! crate.

use std::sync::Arc;

use crate::config::FilterParams;

/// Opaque error type returned by a [`Filter`]/[`FilterBackend`] implementation.
pub type FilterError = Box<dyn core::error::Error + Send + Sync>;
pub type Result<T> = core::result::Result<T, FilterError>;

/// One probabilistic set-membership filter.
///
/// Implementations must be safe to call concurrently: the manager's
/// reader/writer lock only guarantees that `add` never races another `add`
/// or a `contains` batch from the *same* handle, but multiple `contains`
/// calls from concurrent `check` batches on the same filter run genuinely in
/// parallel under shared (read) access.
pub trait Filter: Send + Sync {
    /// Returns whether `key` is possibly present (never a false negative).
    fn contains(&self, key: &[u8]) -> bool;

    /// Adds `key`, returning `true` if it was newly added.
    fn add(&self, key: &[u8]) -> bool;

    /// Forces any buffered writes to durable storage.
    fn flush(&self) -> Result<()>;

    /// Releases in-memory buffers. The filter remains on disk and
    /// registered; a later `contains`/`add` re-opens it lazily.
    fn close(&self) -> Result<()>;

    /// Releases on-disk resources. Called at most once, after the last
    /// reference to the owning handle has been released.
    fn destroy(&self) -> Result<()>;
}

/// Factory for [`Filter`] instances, keyed by name.
///
/// This is the manager's only way to construct or re-open a filter; it
/// corresponds to `init(config, name, create_if_absent) -> filter` in the
/// external interface.
pub trait FilterBackend: Send + Sync {
    fn init(&self, name: &str, params: &FilterParams, create_if_absent: bool)
    -> Result<Arc<dyn Filter>>;
}
