//! Rebroadcast Diagnostics Log
//!
//! Bounded FIFO of failed rebroadcast attempts. Attempt failures never fail
//! a submission; they are kept here so callers can inspect delivery trouble.
//! When full, the oldest entry is dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of entries retained per submission
pub const DEFAULT_CAPACITY: usize = 64;

/// One failed rebroadcast attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptFailure {
    /// 1-based attempt number (the initial send is not counted)
    pub attempt: u32,
    pub error: String,
    pub at: DateTime<Utc>,
}

/// Bounded log of rebroadcast failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastDiagnostics {
    entries: VecDeque<AttemptFailure>,
    capacity: usize,
    /// Entries evicted because the log was full
    dropped: usize,
}

impl BroadcastDiagnostics {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A zero capacity is raised to one so the latest failure is always kept
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Record a failed attempt, evicting the oldest entry when full
    pub fn record(&mut self, attempt: u32, error: impl Into<String>) {
        if self.entries.len() >= self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                self.dropped += 1;
                tracing::debug!(
                    "Diagnostics log full ({}), dropped attempt {}",
                    self.capacity,
                    evicted.attempt
                );
            }
        }

        self.entries.push_back(AttemptFailure {
            attempt,
            error: error.into(),
            at: Utc::now(),
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &AttemptFailure> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&AttemptFailure> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Failures recorded in total, including evicted ones
    pub fn total_failures(&self) -> usize {
        self.entries.len() + self.dropped
    }
}

impl Default for BroadcastDiagnostics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_ordering() {
        let mut log = BroadcastDiagnostics::new();
        log.record(1, "first");
        log.record(2, "second");

        let attempts: Vec<u32> = log.entries().map(|e| e.attempt).collect();
        assert_eq!(attempts, vec![1, 2]);
        assert_eq!(log.latest().unwrap().error, "second");
    }

    #[test]
    fn test_full_log_drops_oldest() {
        let mut log = BroadcastDiagnostics::with_capacity(2);
        log.record(1, "a");
        log.record(2, "b");
        log.record(3, "c");

        assert_eq!(log.len(), 2);
        assert_eq!(log.dropped(), 1);
        assert_eq!(log.total_failures(), 3);
        assert_eq!(log.entries().next().unwrap().attempt, 2);
    }

    #[test]
    fn test_zero_capacity_keeps_latest() {
        let mut log = BroadcastDiagnostics::with_capacity(0);
        log.record(1, "a");
        log.record(2, "b");
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest().unwrap().attempt, 2);
    }
}
