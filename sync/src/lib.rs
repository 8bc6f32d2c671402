//! Spinlock-based primitives for the manager's short critical sections.
//!
//! The registry lock, the create serializer's fast-path existence probe, and
//! the hot-set lock all protect a handful of pointer/counter operations and
//! are never held across I/O or an `await` point. A busy-wait spinlock avoids
//! the syscall overhead of a kernel mutex for these hot paths. Anything that
//! iterates, blocks, or touches the filesystem (the handle's reader/writer
//! lock, the create serializer's slow path) uses `std::sync` instead.

pub mod spin;
