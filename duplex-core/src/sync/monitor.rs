//! Reentrancy monitors.
//!
//! Two variants with the same shape: `enter` returns a guard or fails with
//! [`BindError::Reentrancy`], and the guard releases on drop.
//!
//! - [`ReentrancyMonitor`] keeps a single block count. It is meant for
//!   single-thread protection: a second entry before the first exits is
//!   rejected unless the monitor was built with reentrancy allowed, in which
//!   case the count still grows and callers can inspect it.
//! - [`ThreadReentrancyMonitor`] keeps the set of threads currently inside.
//!   Only the same thread entering twice is rejected; distinct threads are
//!   not serialized here. Layer a lock on top for that.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use dashmap::DashSet;
use tracing::warn;

use crate::error::{BindError, Result};

/// Counter-based reentrancy monitor.
#[derive(Debug, Default)]
pub struct ReentrancyMonitor {
    depth: AtomicUsize,
    allow_reentrancy: bool,
}

impl ReentrancyMonitor {
    /// Create a monitor that rejects any nested entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a monitor that counts nested entries without rejecting them.
    pub fn allowing_reentrancy() -> Self {
        Self {
            depth: AtomicUsize::new(0),
            allow_reentrancy: true,
        }
    }

    /// Enter the monitored section.
    pub fn enter(&self) -> Result<MonitorGuard<'_>> {
        if self.allow_reentrancy {
            self.depth.fetch_add(1, Ordering::AcqRel);
        } else if self
            .depth
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(depth = self.depth(), "rejected reentrant entry");
            return Err(BindError::Reentrancy(
                "section is already entered".to_string(),
            ));
        }

        Ok(MonitorGuard { monitor: self })
    }

    /// Whether any guard is currently held.
    pub fn is_busy(&self) -> bool {
        self.depth() > 0
    }

    /// Number of guards currently held.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    /// Whether nested entries are allowed.
    pub fn allows_reentrancy(&self) -> bool {
        self.allow_reentrancy
    }
}

/// Guard returned by [`ReentrancyMonitor::enter`].
#[must_use = "dropping the guard leaves the section immediately"]
#[derive(Debug)]
pub struct MonitorGuard<'a> {
    monitor: &'a ReentrancyMonitor,
}

impl Drop for MonitorGuard<'_> {
    fn drop(&mut self) {
        self.monitor.depth.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Thread-keyed reentrancy monitor.
#[derive(Debug, Default)]
pub struct ThreadReentrancyMonitor {
    active: DashSet<ThreadId>,
}

impl ThreadReentrancyMonitor {
    /// Create an empty monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the monitored section on the current thread.
    ///
    /// Fails if the current thread is already inside.
    pub fn enter(&self) -> Result<ThreadMonitorGuard<'_>> {
        let thread_id = thread::current().id();
        if !self.active.insert(thread_id) {
            warn!(?thread_id, "rejected reentrant entry from the same thread");
            return Err(BindError::Reentrancy(format!(
                "thread {thread_id:?} is already inside"
            )));
        }

        Ok(ThreadMonitorGuard {
            monitor: self,
            thread_id,
        })
    }

    /// Whether the current thread holds a guard.
    pub fn is_entered_by_current_thread(&self) -> bool {
        self.active.contains(&thread::current().id())
    }

    /// Number of threads currently inside.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

/// Guard returned by [`ThreadReentrancyMonitor::enter`].
#[must_use = "dropping the guard leaves the section immediately"]
#[derive(Debug)]
pub struct ThreadMonitorGuard<'a> {
    monitor: &'a ThreadReentrancyMonitor,
    thread_id: ThreadId,
}

impl Drop for ThreadMonitorGuard<'_> {
    fn drop(&mut self) {
        self.monitor.active.remove(&self.thread_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn simple_monitor_rejects_nested_entry() {
        let monitor = ReentrancyMonitor::new();

        let guard = monitor.enter().unwrap();
        assert!(monitor.is_busy());
        assert!(matches!(monitor.enter(), Err(BindError::Reentrancy(_))));
        // The failed entry did not disturb the count
        assert_eq!(monitor.depth(), 1);

        drop(guard);
        assert!(!monitor.is_busy());
        assert!(monitor.enter().is_ok());
    }

    #[test]
    fn simple_monitor_counts_when_reentrancy_allowed() {
        let monitor = ReentrancyMonitor::allowing_reentrancy();

        let outer = monitor.enter().unwrap();
        let inner = monitor.enter().unwrap();
        assert_eq!(monitor.depth(), 2);

        drop(inner);
        assert_eq!(monitor.depth(), 1);
        drop(outer);
        assert_eq!(monitor.depth(), 0);
    }

    #[test]
    fn thread_monitor_rejects_same_thread() {
        let monitor = ThreadReentrancyMonitor::new();

        let _guard = monitor.enter().unwrap();
        assert!(monitor.is_entered_by_current_thread());
        assert!(matches!(monitor.enter(), Err(BindError::Reentrancy(_))));
    }

    #[test]
    fn thread_monitor_admits_other_threads() {
        let monitor = ThreadReentrancyMonitor::new();
        let barrier = Barrier::new(3);

        std::thread::scope(|s| {
            for _ in 0..3 {
                s.spawn(|| {
                    let _guard = monitor.enter().unwrap();
                    barrier.wait();
                });
            }
        });

        assert_eq!(monitor.active_count(), 0);
    }

    #[test]
    fn thread_monitor_releases_on_unwind() {
        let monitor = ThreadReentrancyMonitor::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = monitor.enter().unwrap();
            panic!("mutation failed");
        }));

        assert!(result.is_err());
        assert!(!monitor.is_entered_by_current_thread());
        assert!(monitor.enter().is_ok());
    }
}
