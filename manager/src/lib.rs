//! Concurrency and lifecycle core of the Bloom-filter service.
//!
//! This crate owns the registry of named filters, the take/return discipline
//! that lets many readers or one writer share a filter while a separate
//! control operation may drop or unmap it, the hot-set bookkeeping consumed
//! by an external periodic flusher, and the startup discovery that rebuilds
//! the registry from on-disk state.
//!
//! The probabilistic set-membership data structure itself, the wire
//! protocol, and the periodic flusher are external collaborators: this
//! crate only defines the [`filter::Filter`] / [`filter::FilterBackend`]
//! seam they plug into.

mod discovery;
mod handle;
mod hotset;
mod registry;

pub mod config;
pub mod error;
pub mod filter;
pub mod manager;

pub use config::{Config, FilterParams};
pub use error::Error;
pub use manager::FilterManager;

/// Prefix used for a filter's on-disk directory, e.g. `bloomd.users`.
pub const FILTER_DIR_PREFIX: &str = "bloomd.";
