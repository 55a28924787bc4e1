//! Rollback-only signal handed to unit-of-work callbacks.

use std::sync::atomic::{AtomicBool, Ordering};

/// Write-once rollback signal for one unit-of-work attempt.
///
/// The handler creates a fresh instance per invocation and passes it to the
/// callback; the callback may only set it, and the handler reads it back
/// after the callback returns. Setting the signal forces a rollback even on
/// a normal return.
pub struct TransactionStatus {
    rollback_only: AtomicBool,
}

impl TransactionStatus {
    pub(crate) fn new() -> Self {
        Self {
            rollback_only: AtomicBool::new(false),
        }
    }

    /// Marks the current transaction to be rolled back regardless of the
    /// callback's return value. Cannot be unset.
    pub fn set_rollback_only(&self) {
        self.rollback_only.store(true, Ordering::SeqCst);
    }

    /// Whether rollback was requested.
    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only.load(Ordering::SeqCst)
    }
}
