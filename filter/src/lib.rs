//! `bloomd-filter` — the concrete probabilistic set-membership collaborator
//! the filter manager (`bloomd-manager`) treats as opaque.
//!
//! A standard (non-counting, non-scalable) Bloom filter: a fixed-size bit
//! array sized from a target capacity and false-positive rate, with `k`
//! bit positions per key derived by Kirsch-Mitzenmacher double hashing.
//! Storage is either pure in-memory, memory-mapped (`mmap` feature), or a
//! buffered file read wholesale into memory — see [`backend::DiskFilter`].

mod backend;
mod bits;
pub mod error;
mod header;
pub mod sizing;

pub use backend::{DiskFilter, LocalDiskFilterBackend};
pub use error::Error;
pub use sizing::Sizing;
