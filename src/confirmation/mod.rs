//! Confirmation watcher
//!
//! Races a one-shot push notification against optional status polling and a
//! deadline. The first source to settle wins; the push registration is
//! released on every exit path.

pub mod latch;
pub mod subscription;

pub use latch::CompletionLatch;
pub use subscription::SubscriptionGuard;

use crate::network::{
    Commitment, Connection, SignatureNotification, SignatureStatus, SignatureSubscription,
};
use serde::{Deserialize, Serialize};
use solana_sdk::{signature::Signature, transaction::TransactionError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;

/// Default deadline for one confirmation watch
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(180_000);

/// Default interval between status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2_000);

/// Status captured by whichever confirmation source settled first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationStatus {
    pub slot: u64,
    /// Confirmation depth at capture time; None once rooted
    pub confirmations: Option<usize>,
    pub err: Option<TransactionError>,
}

impl From<SignatureNotification> for ConfirmationStatus {
    fn from(notification: SignatureNotification) -> Self {
        Self {
            slot: notification.slot,
            confirmations: Some(0),
            err: notification.err,
        }
    }
}

impl From<SignatureStatus> for ConfirmationStatus {
    fn from(status: SignatureStatus) -> Self {
        Self {
            slot: status.slot,
            confirmations: status.confirmations,
            err: status.err,
        }
    }
}

/// Parameters of one confirmation watch
#[derive(Debug, Clone)]
pub struct ConfirmationOptions {
    pub timeout: Duration,
    pub commitment: Commitment,
    /// Enable the status polling source alongside the push source
    pub query_status: bool,
    pub poll_interval: Duration,
}

impl Default for ConfirmationOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            commitment: Commitment::Confirmed,
            query_status: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Terminal failures of a confirmation watch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationError {
    #[error("Transaction rejected in slot {}: {:?}", .0.slot, .0.err)]
    Rejected(ConfirmationStatus),

    #[error("Timed out waiting for confirmation; status unknown")]
    Timeout,
}

enum Outcome {
    Push(SignatureNotification),
    Pull(SignatureStatus),
    Timeout,
}

/// Wait until `signature` is confirmed, rejected or the deadline passes
///
/// `latch` is set when the watch settles, whichever way it settles.
pub async fn await_signature_confirmation(
    connection: &Arc<dyn Connection>,
    signature: &Signature,
    options: &ConfirmationOptions,
    latch: &CompletionLatch,
) -> Result<ConfirmationStatus, ConfirmationError> {
    let deadline = tokio::time::sleep(options.timeout);
    let mut guard: Option<SubscriptionGuard> = None;

    let outcome = tokio::select! {
        event = watch_push(connection, signature, options.commitment, &mut guard) => Outcome::Push(event),
        status = poll_until_settled(connection.as_ref(), signature, options) => Outcome::Pull(status),
        _ = deadline => Outcome::Timeout,
    };

    if let Some(guard) = guard.as_mut() {
        guard.release().await;
    }
    latch.try_complete();

    match outcome {
        Outcome::Push(event) => {
            let status = ConfirmationStatus::from(event);
            if status.err.is_some() {
                tracing::warn!("Rejected via websocket: {} {:?}", signature, status.err);
                Err(ConfirmationError::Rejected(status))
            } else {
                tracing::debug!("Confirmed via websocket: {} slot {}", signature, status.slot);
                Ok(status)
            }
        }
        Outcome::Pull(status) => {
            let status = ConfirmationStatus::from(status);
            if status.err.is_some() {
                Err(ConfirmationError::Rejected(status))
            } else {
                Ok(status)
            }
        }
        Outcome::Timeout => {
            tracing::warn!("Confirmation timed out for {}", signature);
            Err(ConfirmationError::Timeout)
        }
    }
}

/// Register for the push notification and wait for it
///
/// The registration lands in `slot` as soon as it exists so the caller can
/// release it whichever source wins. Never returns when setup fails or the
/// source closes without a value.
async fn watch_push(
    connection: &Arc<dyn Connection>,
    signature: &Signature,
    commitment: Commitment,
    slot: &mut Option<SubscriptionGuard>,
) -> SignatureNotification {
    let SignatureSubscription { id, notification } =
        match connection.on_signature(signature, commitment).await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::warn!("Signature subscription failed for {}: {}", signature, e);
                return std::future::pending().await;
            }
        };
    *slot = Some(SubscriptionGuard::new(Arc::clone(connection), id));

    match notification.await {
        Ok(event) => event,
        Err(_) => {
            tracing::debug!("Push source closed for {}", signature);
            std::future::pending().await
        }
    }
}

/// Poll until a status carries an error or a nonzero confirmation count
///
/// A record with zero confirmations still counts as pending. Never returns
/// when polling is disabled.
async fn poll_until_settled(
    connection: &dyn Connection,
    signature: &Signature,
    options: &ConfirmationOptions,
) -> SignatureStatus {
    if !options.query_status {
        return std::future::pending().await;
    }

    let mut ticker = tokio::time::interval(options.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let status = match connection.get_signature_statuses(&[*signature]).await {
            Ok(statuses) => statuses.into_iter().next().flatten(),
            Err(e) => {
                tracing::warn!("Status poll failed for {}: {}", signature, e);
                continue;
            }
        };

        match status {
            None => tracing::debug!("No status yet for {}", signature),
            Some(status) if status.err.is_some() => {
                tracing::warn!("Status poll reported error for {}: {:?}", signature, status.err);
                return status;
            }
            Some(status) if status.confirmations.unwrap_or(0) == 0 => {
                tracing::debug!("No confirmations yet for {}", signature);
            }
            Some(status) => {
                tracing::debug!("Confirmed via status poll: {} slot {}", signature, status.slot);
                return status;
            }
        }
    }
}
