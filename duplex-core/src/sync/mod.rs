//! Synchronization Primitives
//!
//! Scoped acquire/release wrappers used throughout the engine. Every
//! primitive here hands out a guard whose `Drop` releases what was taken,
//! so a failing or panicking operation can never leak a lock or a marker.
//!
//! # Primitives
//!
//! - [`ScopedRwLock`]: read/write lock with read, write and upgradable scopes
//! - [`SyncFlag`]: a single "operation in progress" flag owned by one binder
//! - [`ReentrancyMonitor`]: counter-based, single-thread reentrancy detection
//! - [`ThreadReentrancyMonitor`]: per-thread reentrancy detection that does
//!   not serialize distinct threads
//!
//! # Nesting
//!
//! Guards must nest: a guard taken inside a propagation step is released
//! before or when that step's scope ends. Guards borrow the primitive they
//! came from, so the borrow checker enforces that they cannot outlive it,
//! and none of them are `Send`-transferred to another thread by the engine.

mod flag;
mod lock;
mod monitor;

pub use flag::{SyncFlag, SyncScope};
pub use lock::{ReadScope, ScopedRwLock, UpgradableScope, WriteScope};
pub use monitor::{MonitorGuard, ReentrancyMonitor, ThreadMonitorGuard, ThreadReentrancyMonitor};
