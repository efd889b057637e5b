//! Free-list pool for reusable per-call allocations
//!
//! Entries are checked out as [`Pooled`] guards. A guard is move-only and
//! borrows the pool, so an entry cannot outlive its pool and cannot be used
//! after it has been handed back.

use parking_lot::Mutex;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Default number of idle entries kept for reuse
pub const DEFAULT_POOL_RETAIN: usize = 64;

/// Objects that can be scrubbed before going back to a pool
pub trait Reusable: Default {
    /// Release payloads that should not be pinned while idle.
    fn reset(&mut self);
}

pub struct Pool<T: Reusable> {
    free: Mutex<Vec<Box<T>>>,
    retain: usize,
}

impl<T: Reusable> Pool<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_retain(DEFAULT_POOL_RETAIN)
    }

    /// Create a pool that keeps at most `retain` idle entries.
    #[must_use]
    pub fn with_retain(retain: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            retain,
        }
    }

    /// Check out an entry, allocating a fresh one when the pool is empty.
    pub fn acquire(&self) -> Pooled<'_, T> {
        let item = self.free.lock().pop().unwrap_or_default();
        Pooled {
            item: Some(item),
            pool: self,
        }
    }

    /// Number of idle entries currently held.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn release(&self, mut item: Box<T>) {
        item.reset();
        let mut free = self.free.lock();
        if free.len() < self.retain {
            free.push(item);
        }
    }
}

impl<T: Reusable> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Reusable> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("idle", &self.idle())
            .field("retain", &self.retain)
            .finish()
    }
}

/// A checked-out pool entry, returned to its pool on drop
pub struct Pooled<'a, T: Reusable> {
    item: Option<Box<T>>,
    pool: &'a Pool<T>,
}

impl<T: Reusable> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `Drop` takes the item out.
        self.item.as_deref().unwrap_or_else(|| unreachable!())
    }
}

impl<T: Reusable> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_deref_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<T: Reusable> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}
