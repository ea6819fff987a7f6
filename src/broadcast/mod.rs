//! Broadcast loop
//!
//! Resends the same signed bytes on a fixed interval until the submission's
//! completion latch is set or the deadline passes. Individual attempts run
//! as background tasks; their failures are recorded, never raised.

pub mod diagnostics;

pub use diagnostics::{AttemptFailure, BroadcastDiagnostics};

use crate::confirmation::CompletionLatch;
use crate::network::{Connection, NetworkError, SendOptions};
use solana_sdk::signature::Signature;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

/// Default spacing between rebroadcasts
pub const DEFAULT_REBROADCAST_INTERVAL: Duration = Duration::from_millis(500);

/// Timing of one broadcast loop
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    pub interval: Duration,
    pub timeout: Duration,
    pub diagnostics_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REBROADCAST_INTERVAL,
            timeout: crate::confirmation::DEFAULT_TIMEOUT,
            diagnostics_capacity: diagnostics::DEFAULT_CAPACITY,
        }
    }
}

/// Summary of a finished broadcast loop
#[derive(Debug, Clone, Default)]
pub struct BroadcastReport {
    /// Rebroadcasts issued
    pub attempts: u32,
    /// Rebroadcasts the node accepted
    pub delivered: u32,
    pub diagnostics: BroadcastDiagnostics,
}

impl BroadcastReport {
    pub fn failures(&self) -> usize {
        self.diagnostics.total_failures()
    }
}

/// Handle to a running broadcast loop; dropping it stops the loop
pub struct BroadcastLoop {
    handle: JoinHandle<BroadcastReport>,
}

impl BroadcastLoop {
    /// Start rebroadcasting `wire_transaction` in the background
    pub fn spawn(
        connection: Arc<dyn Connection>,
        wire_transaction: Arc<Vec<u8>>,
        config: BroadcastConfig,
        latch: CompletionLatch,
    ) -> Self {
        let handle = tokio::spawn(run(connection, wire_transaction, config, latch));
        Self { handle }
    }

    /// Wait for the loop to stop and collect its report
    pub async fn join(mut self) -> BroadcastReport {
        match (&mut self.handle).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("Broadcast loop ended abnormally: {}", e);
                BroadcastReport::default()
            }
        }
    }

}

impl Drop for BroadcastLoop {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            tracing::debug!("Broadcast loop dropped before settling; aborting");
            self.handle.abort();
        }
    }
}

type AttemptResult = (u32, Result<Signature, NetworkError>);

async fn run(
    connection: Arc<dyn Connection>,
    wire_transaction: Arc<Vec<u8>>,
    config: BroadcastConfig,
    latch: CompletionLatch,
) -> BroadcastReport {
    let mut report = BroadcastReport {
        diagnostics: BroadcastDiagnostics::with_capacity(config.diagnostics_capacity),
        ..BroadcastReport::default()
    };
    let mut in_flight: JoinSet<AttemptResult> = JoinSet::new();

    let deadline = tokio::time::sleep(config.timeout);
    tokio::pin!(deadline);
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = latch.completed() => break,
            _ = &mut deadline => {
                tracing::debug!("Broadcast deadline reached after {} attempts", report.attempts);
                break;
            }
            Some(joined) = in_flight.join_next() => record(&mut report, joined),
            _ = ticker.tick() => {
                report.attempts += 1;
                let attempt = report.attempts;
                let connection = Arc::clone(&connection);
                let bytes = Arc::clone(&wire_transaction);
                in_flight.spawn(async move {
                    let result = connection
                        .send_raw_transaction(&bytes, SendOptions::skip_preflight())
                        .await;
                    (attempt, result)
                });
            }
        }
    }

    while let Some(joined) = in_flight.try_join_next() {
        record(&mut report, joined);
    }
    in_flight.shutdown().await;

    tracing::debug!(
        "Broadcast loop stopped: {} attempts, {} delivered, {} failed",
        report.attempts,
        report.delivered,
        report.failures()
    );
    report
}

fn record(report: &mut BroadcastReport, joined: Result<AttemptResult, JoinError>) {
    match joined {
        Ok((attempt, Ok(signature))) => {
            report.delivered += 1;
            tracing::trace!("Rebroadcast {} delivered {}", attempt, signature);
        }
        Ok((attempt, Err(e))) => {
            tracing::debug!("Rebroadcast {} failed: {}", attempt, e);
            report.diagnostics.record(attempt, e.to_string());
        }
        Err(e) if e.is_cancelled() => {}
        Err(e) => tracing::warn!("Rebroadcast task panicked: {}", e),
    }
}
