//! Scoped read/write lock.
//!
//! Wraps a `parking_lot` read/write lock so that every acquisition returns a
//! scope object. Releasing happens when the scope is dropped or when
//! `release` is called; `release` consumes the scope, so a double release is
//! rejected at compile time rather than at runtime.
//!
//! Blocking is indefinite. There is no timeout; callers that need one must
//! wrap the lock themselves.

use std::fmt::{self, Debug};
use std::ops::{Deref, DerefMut};

use parking_lot::{
    RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard,
};

/// A read/write lock that only hands out scoped access.
///
/// Multiple readers may hold the lock at once. A writer excludes all readers
/// and all other writers. An upgradable scope excludes writers and other
/// upgradable scopes but admits plain readers, which lets a mutation emit
/// notifications that read the protected value.
pub struct ScopedRwLock<T> {
    inner: RwLock<T>,
}

impl<T> ScopedRwLock<T> {
    /// Create a new lock protecting `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(value),
        }
    }

    /// Acquire shared read access, blocking until no writer holds the lock.
    ///
    /// Reads are recursive: a thread that already holds a read or upgradable
    /// scope may take another read scope even while a writer is queued.
    pub fn acquire_read(&self) -> ReadScope<'_, T> {
        ReadScope {
            guard: self.inner.read_recursive(),
        }
    }

    /// Acquire exclusive write access, blocking until every reader and writer
    /// has released.
    pub fn acquire_write(&self) -> WriteScope<'_, T> {
        WriteScope {
            guard: self.inner.write(),
        }
    }

    /// Try to acquire write access without blocking.
    pub fn try_acquire_write(&self) -> Option<WriteScope<'_, T>> {
        self.inner.try_write().map(|guard| WriteScope { guard })
    }

    /// Acquire an upgradable read scope.
    ///
    /// Only one upgradable scope exists at a time, and no writer can enter
    /// while it is held.
    pub fn acquire_upgradable(&self) -> UpgradableScope<'_, T> {
        UpgradableScope {
            guard: self.inner.upgradable_read(),
        }
    }

    /// Consume the lock and return the protected value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: Default> Default for ScopedRwLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Debug> Debug for ScopedRwLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedRwLock")
            .field("value", &*self.acquire_read())
            .finish()
    }
}

/// Shared read access. Released on drop.
#[must_use = "dropping the scope releases the read lock immediately"]
pub struct ReadScope<'a, T> {
    guard: RwLockReadGuard<'a, T>,
}

impl<T> ReadScope<'_, T> {
    /// Release the read lock.
    pub fn release(self) {
        drop(self);
    }
}

impl<T> Deref for ReadScope<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

/// Exclusive write access. Released on drop.
#[must_use = "dropping the scope releases the write lock immediately"]
pub struct WriteScope<'a, T> {
    guard: RwLockWriteGuard<'a, T>,
}

impl<'a, T> WriteScope<'a, T> {
    /// Release the write lock.
    pub fn release(self) {
        drop(self);
    }

    /// Atomically turn this write scope into a read scope.
    ///
    /// No other writer can slip in between the two.
    pub fn downgrade(self) -> ReadScope<'a, T> {
        ReadScope {
            guard: RwLockWriteGuard::downgrade(self.guard),
        }
    }

    /// Atomically turn this write scope into an upgradable scope.
    ///
    /// Readers are admitted again, writers stay excluded.
    pub fn downgrade_to_upgradable(self) -> UpgradableScope<'a, T> {
        UpgradableScope {
            guard: RwLockWriteGuard::downgrade_to_upgradable(self.guard),
        }
    }
}

impl<T> Deref for WriteScope<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for WriteScope<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

/// Read access that can later be upgraded to write access.
#[must_use = "dropping the scope releases the lock immediately"]
pub struct UpgradableScope<'a, T> {
    guard: RwLockUpgradableReadGuard<'a, T>,
}

impl<'a, T> UpgradableScope<'a, T> {
    /// Upgrade to exclusive write access, waiting for plain readers to leave.
    pub fn upgrade(self) -> WriteScope<'a, T> {
        WriteScope {
            guard: RwLockUpgradableReadGuard::upgrade(self.guard),
        }
    }

    /// Release the lock.
    pub fn release(self) {
        drop(self);
    }
}

impl<T> Deref for UpgradableScope<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}
