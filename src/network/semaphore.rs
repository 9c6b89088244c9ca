//! Counting semaphore
//!
//! Bounds the number of connections served at once.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::Shutdown;

/// How often a blocked `acquire_until` re-checks the shutdown signal
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Counting semaphore with RAII permits
///
/// ## Concurrency:
/// - `available`: Protected by Mutex, waiters parked on `released`
pub struct Semaphore {
    available: Mutex<usize>,
    released: Condvar,
    capacity: usize,
}

/// One admission slot; returned to its semaphore on drop
pub struct Permit {
    semaphore: Arc<Semaphore>,
}

impl Semaphore {
    /// Create a semaphore with `capacity` slots (at least one)
    pub fn new(capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        Arc::new(Self {
            available: Mutex::new(capacity),
            released: Condvar::new(),
            capacity,
        })
    }

    /// Block until a slot is free
    pub fn acquire(self: &Arc<Self>) -> Permit {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
        Permit {
            semaphore: Arc::clone(self),
        }
    }

    /// Block until a slot is free or `shutdown` is triggered
    pub fn acquire_until(self: &Arc<Self>, shutdown: &Shutdown) -> Option<Permit> {
        let mut available = self.available.lock();
        while *available == 0 {
            if shutdown.is_triggered() {
                return None;
            }
            self.released.wait_for(&mut available, SHUTDOWN_POLL_INTERVAL);
        }
        if shutdown.is_triggered() {
            return None;
        }
        *available -= 1;
        Some(Permit {
            semaphore: Arc::clone(self),
        })
    }

    /// Take a slot only if one is free right now
    pub fn try_acquire(self: &Arc<Self>) -> Option<Permit> {
        let mut available = self.available.lock();
        if *available == 0 {
            return None;
        }
        *available -= 1;
        Some(Permit {
            semaphore: Arc::clone(self),
        })
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        *self.available.lock()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self) {
        let mut available = self.available.lock();
        *available += 1;
        debug_assert!(*available <= self.capacity);
        self.released.notify_one();
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}
