//! Network connection boundary for the submission client
//!
//! Every component reaches the cluster through the [`Connection`] trait. The
//! handle is shared read-only; no component mutates its configuration.

pub mod memory;
#[cfg(feature = "rpc-client")]
pub mod rpc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::TransactionError,
};
use std::fmt;
use thiserror::Error;
use tokio::sync::oneshot;

/// Consistency level demanded by a read or a confirmation check
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    /// Seen by the connected node
    #[serde(alias = "recent")]
    Processed,
    /// Voted on by a supermajority
    #[default]
    Confirmed,
    /// Rooted
    Finalized,
}

impl From<Commitment> for CommitmentConfig {
    fn from(commitment: Commitment) -> Self {
        match commitment {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// Options for a raw transaction send
#[derive(Debug, Clone, Copy, Default)]
pub struct SendOptions {
    /// Skip the node-side simulation before forwarding
    pub skip_preflight: bool,
    /// Node-side retry budget (None leaves the node default)
    pub max_retries: Option<usize>,
}

impl SendOptions {
    /// Options used by every send in the pipeline
    pub fn skip_preflight() -> Self {
        Self {
            skip_preflight: true,
            max_retries: None,
        }
    }
}

/// Latest block reference and the last block height at which it is valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockhashInfo {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Point-in-time status of one signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    /// Slot the transaction was processed in
    pub slot: u64,
    /// Confirmation depth; None once the slot is rooted
    pub confirmations: Option<usize>,
    /// Error reported by the chain, if execution failed
    pub err: Option<TransactionError>,
    /// Commitment level reached, when the node reports it
    pub confirmation_status: Option<Commitment>,
}

impl SignatureStatus {
    /// Whether this status has reached `commitment`
    pub fn satisfies(&self, commitment: Commitment) -> bool {
        let reached = self.confirmation_status.or(if self.confirmations.is_none() {
            Some(Commitment::Finalized)
        } else {
            None
        });
        reached.is_some_and(|level| level >= commitment)
    }
}

/// One-shot push notification delivered for a watched signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureNotification {
    pub slot: u64,
    pub err: Option<TransactionError>,
}

/// Identifier of an active push registration
pub type SubscriptionId = u64;

/// Active push registration for one signature
#[derive(Debug)]
pub struct SignatureSubscription {
    pub id: SubscriptionId,
    /// Fires at most once; closed without a value if the source goes away
    pub notification: oneshot::Receiver<SignatureNotification>,
}

/// Cluster access used by the submission pipeline
#[async_trait]
pub trait Connection: Send + Sync {
    /// Broadcast already-serialized transaction bytes
    async fn send_raw_transaction(
        &self,
        wire_transaction: &[u8],
        options: SendOptions,
    ) -> Result<Signature, NetworkError>;

    /// Fetch the latest block reference at `commitment`
    async fn get_latest_blockhash(
        &self,
        commitment: Commitment,
    ) -> Result<BlockhashInfo, NetworkError>;

    /// Current block height at `commitment`
    async fn get_block_height(&self, commitment: Commitment) -> Result<u64, NetworkError>;

    /// Point-in-time status lookup, one entry per requested signature
    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>, NetworkError>;

    /// Register a one-shot notification for `signature` at `commitment`
    async fn on_signature(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<SignatureSubscription, NetworkError>;

    /// Release a push registration; unknown ids are ignored
    async fn remove_signature_listener(&self, id: SubscriptionId) -> Result<(), NetworkError>;

    /// Raw account data, or None if the account does not exist
    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, NetworkError>;

    /// Fee paid by a landed transaction, or None if it cannot be found
    async fn get_transaction_fee(&self, signature: &Signature)
        -> Result<Option<u64>, NetworkError>;
}

/// Error types for network operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
