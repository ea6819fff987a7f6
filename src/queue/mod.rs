//! Batch Signing Queue for the Sonic client
//!
//! Signs a batch of versioned transactions, batched when the wallet allows
//! it, then submits them on a fixed stagger:
//! - Signing failures are isolated per transaction
//! - The k-th signed transaction is broadcast k intervals after the start
//! - Each transaction is confirmed independently; results come back per item

pub mod settlement;

pub use settlement::{reduce_settled, Settled, Settlement};

use crate::confirmation::{
    await_signature_confirmation, CompletionLatch, ConfirmationError, ConfirmationOptions,
};
use crate::network::{Commitment, Connection, SendOptions};
use crate::transaction::SubmitError;
use crate::wallet::WalletAdapter;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use solana_sdk::{signature::Signature, transaction::VersionedTransaction};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default spacing between staggered submissions
pub const DEFAULT_TX_INTERVAL: Duration = Duration::from_millis(500);

/// Queue configuration
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Delay between consecutive submissions
    pub tx_interval: Duration,
    /// Confirmation settings applied to every queued transaction
    pub confirmation: ConfirmationOptions,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            tx_interval: DEFAULT_TX_INTERVAL,
            confirmation: ConfirmationOptions {
                commitment: Commitment::Processed,
                ..ConfirmationOptions::default()
            },
        }
    }
}

/// A queued transaction that confirmed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedConfirmation {
    /// Position in the submitted batch
    pub index: usize,
    pub signature: Signature,
    pub slot: u64,
}

/// Per-item result of a batch, in input order
pub type BatchSettlement = Settlement<QueuedConfirmation, SubmitError>;

/// Batch counts for logging and monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub confirmed: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_settlements(settlements: &[BatchSettlement]) -> Self {
        let confirmed = settlements.iter().filter(|s| s.is_fulfilled()).count();
        Self {
            total: settlements.len(),
            confirmed,
            failed: settlements.len() - confirmed,
        }
    }
}

/// Signs and submits batches over one connection
pub struct BatchSigningQueue {
    connection: Arc<dyn Connection>,
    config: QueueConfig,
}

impl BatchSigningQueue {
    pub fn new(connection: Arc<dyn Connection>) -> Self {
        Self::with_config(connection, QueueConfig::default())
    }

    pub fn with_config(connection: Arc<dyn Connection>, config: QueueConfig) -> Self {
        Self { connection, config }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Sign `transactions` and submit every signed one on the stagger
    ///
    /// Fails as a whole only when the wallet is disconnected or a batch
    /// signing request is refused. Otherwise every input index gets its own
    /// settlement.
    pub async fn queue_versioned_transaction_sign(
        &self,
        wallet: &dyn WalletAdapter,
        transactions: Vec<VersionedTransaction>,
    ) -> Result<Vec<BatchSettlement>, SubmitError> {
        if wallet.public_key().is_none() {
            return Err(SubmitError::WalletNotConnected);
        }
        let total = transactions.len();

        let signed: Vec<Result<VersionedTransaction, SubmitError>> = if wallet.supports_sign_all() {
            wallet
                .sign_all_transactions(transactions)
                .await
                .map_err(SubmitError::Signing)?
                .into_iter()
                .map(Ok)
                .collect()
        } else {
            join_all(transactions.into_iter().map(|tx| async move {
                wallet.sign_transaction(tx).await.map_err(SubmitError::Signing)
            }))
            .await
        };

        let signed_count = signed.iter().filter(|r| r.is_ok()).count();
        if signed_count < total {
            tracing::warn!("Signed {}/{} transactions", signed_count, total);
        }

        let start = Instant::now();
        let mut position = 0usize;
        let submissions = signed.into_iter().enumerate().map(|(index, signed)| {
            let offset = match signed {
                Ok(_) => {
                    let offset = self.config.tx_interval * position as u32;
                    position += 1;
                    offset
                }
                Err(_) => Duration::ZERO,
            };
            async move {
                let tx = signed?;
                tokio::time::sleep_until(start + offset).await;
                tracing::info!("Requesting transaction {}/{}", index + 1, total);
                self.submit_one(index, &tx).await
            }
        });

        let settlements: Vec<BatchSettlement> = join_all(submissions)
            .await
            .into_iter()
            .map(Settlement::from)
            .collect();

        let summary = BatchSummary::from_settlements(&settlements);
        tracing::info!(
            "Batch settled: {}/{} confirmed, {} failed",
            summary.confirmed,
            summary.total,
            summary.failed
        );
        Ok(settlements)
    }

    async fn submit_one(
        &self,
        index: usize,
        transaction: &VersionedTransaction,
    ) -> Result<QueuedConfirmation, SubmitError> {
        let wire_transaction = bincode::serialize(transaction)
            .map_err(|e| SubmitError::Build(format!("Failed to serialize transaction: {}", e)))?;

        let signature = self
            .connection
            .send_raw_transaction(&wire_transaction, SendOptions::skip_preflight())
            .await
            .map_err(SubmitError::Broadcast)?;
        tracing::debug!("Started awaiting confirmation for {}", signature);

        let latch = CompletionLatch::new();
        match await_signature_confirmation(
            &self.connection,
            &signature,
            &self.config.confirmation,
            &latch,
        )
        .await
        {
            Ok(status) => Ok(QueuedConfirmation {
                index,
                signature,
                slot: status.slot,
            }),
            Err(ConfirmationError::Rejected(status)) => Err(SubmitError::TransactionFailed {
                signature,
                slot: status.slot,
                error: status.err,
            }),
            Err(ConfirmationError::Timeout) => Err(SubmitError::Timeout { signature }),
        }
    }
}
