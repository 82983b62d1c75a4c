//! Syncing flag.
//!
//! A single boolean that marks "a propagation step is in progress" for one
//! binder or synchronizer. It is not a counter: a second `begin` while the
//! flag is set returns `None`, and the caller is expected to do nothing
//! rather than recurse.
//!
//! The flag is per owner, not per thread. An owner driven from several
//! threads without external locking can see another thread's step and
//! skip a propagation it should have performed.

use std::sync::atomic::{AtomicBool, Ordering};

/// "Operation in progress" flag.
#[derive(Debug, Default)]
pub struct SyncFlag {
    in_progress: AtomicBool,
}

impl SyncFlag {
    /// Create a cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a step is currently in progress.
    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Start a step.
    ///
    /// Returns `None` if a step is already in progress. The returned scope
    /// clears the flag when dropped, on every exit path including unwinding.
    pub fn begin(&self) -> Option<SyncScope<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncScope { flag: self })
    }
}

/// Guard that clears its [`SyncFlag`] when dropped.
#[must_use = "dropping the scope ends the step immediately"]
#[derive(Debug)]
pub struct SyncScope<'a> {
    flag: &'a SyncFlag,
}

impl Drop for SyncScope<'_> {
    fn drop(&mut self) {
        self.flag.in_progress.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_sets_and_drop_clears() {
        let flag = SyncFlag::new();
        assert!(!flag.is_in_progress());

        {
            let _scope = flag.begin().unwrap();
            assert!(flag.is_in_progress());
        }

        assert!(!flag.is_in_progress());
    }

    #[test]
    fn second_begin_is_observable() {
        let flag = SyncFlag::new();
        let _scope = flag.begin().unwrap();

        assert!(flag.begin().is_none());
        assert!(flag.is_in_progress());
    }

    #[test]
    fn cleared_on_unwind() {
        let flag = SyncFlag::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = flag.begin().unwrap();
            panic!("propagation failed");
        }));

        assert!(result.is_err());
        assert!(!flag.is_in_progress());
        assert!(flag.begin().is_some());
    }
}
