//! Thin wrappers over `spin::Mutex` / `spin::RwLock`.
//!
//! # Usage guidelines
//!
//! Only reach for these when every operation performed while the lock is
//! held is O(1): a `HashMap` insert/remove/lookup, a counter bump, a
//! boolean flip. Never hold one across disk I/O, a blocking syscall, or a
//! nested lock acquisition — use `std::sync::Mutex`/`RwLock` for those.

pub use spin::MutexGuard;
pub use spin::RwLockReadGuard;
pub use spin::RwLockWriteGuard;

/// A spinlock-guarded value for O(1) critical sections.
#[derive(Debug, Default)]
pub struct Mutex<T>(spin::Mutex<T>);

impl<T> Mutex<T> {
    #[inline]
    pub const fn new(value: T) -> Self {
        Self(spin::Mutex::new(value))
    }

    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.0.lock()
    }

    #[inline]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.0.try_lock()
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.0.get_mut()
    }
}

/// A spinlock-guarded reader/writer value for read-heavy O(1) critical sections.
#[derive(Debug, Default)]
pub struct RwLock<T>(spin::RwLock<T>);

impl<T> RwLock<T> {
    #[inline]
    pub const fn new(value: T) -> Self {
        Self(spin::RwLock::new(value))
    }

    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read()
    }

    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write()
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.0.get_mut()
    }
}
