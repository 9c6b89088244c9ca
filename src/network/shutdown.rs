//! Shutdown signal
//!
//! Shared flag used to stop the accept loop from another thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable cancellation signal
///
/// Triggering it stops the server's accept loop. Connections that are
/// already open are not interrupted; they finish on their own next I/O.
#[derive(Clone, Debug, Default)]
pub struct Shutdown {
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let every holder of this signal know that we are shutting down
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
    }

    /// Immediate, non-blocking check of the flag
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}
