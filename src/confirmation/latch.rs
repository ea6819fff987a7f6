//! Per-submission completion latch
//!
//! Shared by the broadcast loop and the confirmation watcher. Set exactly
//! once; every holder observes the transition through the token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// One-time "done" signal for a single submission
#[derive(Debug, Clone, Default)]
pub struct CompletionLatch {
    done: Arc<AtomicBool>,
    token: CancellationToken,
}

impl CompletionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the submission settled. Returns true only for the caller that won
    pub fn try_complete(&self) -> bool {
        let won = self
            .done
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.token.cancel();
        }
        won
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Resolves once the latch has been set
    pub fn completed(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}
