//! Sonic submission client
//!
//! Builds, signs, broadcasts and confirms transactions against a Sonic
//! cluster. A submission rebroadcasts its signed bytes until a confirmation
//! watcher settles it through a push subscription, status polling or the
//! deadline, whichever comes first.

pub mod broadcast;
pub mod config;
pub mod confirmation;
pub mod network;
pub mod queue;
pub mod transaction;
pub mod util;
pub mod wallet;

pub use config::{ClientConfig, ConfigError};
pub use confirmation::{ConfirmationError, ConfirmationStatus};
pub use network::{Commitment, Connection, NetworkError};
pub use queue::{BatchSettlement, BatchSigningQueue, BatchSummary};
pub use transaction::{
    FailureKind, PriorityConfig, SubmitError, SubmitRequest, TransactionReceipt,
    TransactionService,
};
pub use wallet::{KeypairWallet, WalletAdapter, WalletError};

use solana_sdk::{
    signature::Signature,
    transaction::{Transaction, VersionedTransaction},
};
use std::sync::Arc;
use thiserror::Error;

/// Shared client context
///
/// Owns the connection handle and hands it to the submission and batch
/// pipelines. Create one per cluster and share it by reference.
pub struct SonicClient {
    connection: Arc<dyn Connection>,
    config: ClientConfig,
    transactions: TransactionService,
    queue: BatchSigningQueue,
}

impl SonicClient {
    /// Client over the configured RPC and websocket endpoints
    #[cfg(feature = "rpc-client")]
    pub fn new(config: ClientConfig) -> Result<Self, SonicError> {
        config.validate()?;
        let connection = network::rpc::RpcConnection::new(
            &config.network.rpc_url,
            &config.network.ws_url,
            config.submit.commitment,
        );
        tracing::info!("🌐 Connected client to {}", config.network.rpc_url);
        Ok(Self::with_connection(Arc::new(connection), config))
    }

    /// Load configuration, then connect
    #[cfg(feature = "rpc-client")]
    pub fn from_config(path: Option<&std::path::Path>) -> Result<Self, SonicError> {
        Self::new(ClientConfig::load(path)?)
    }

    /// Client over an existing connection
    pub fn with_connection(connection: Arc<dyn Connection>, config: ClientConfig) -> Self {
        let transactions =
            TransactionService::new(Arc::clone(&connection), config.submit_settings());
        let queue = BatchSigningQueue::with_config(Arc::clone(&connection), config.queue_config());
        Self {
            connection,
            config,
            transactions,
            queue,
        }
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transactions(&self) -> &TransactionService {
        &self.transactions
    }

    pub fn queue(&self) -> &BatchSigningQueue {
        &self.queue
    }

    /// Build with the configured priority unless the request sets its own
    pub async fn send_transaction(
        &self,
        wallet: &dyn WalletAdapter,
        mut request: SubmitRequest,
    ) -> Result<TransactionReceipt, SonicError> {
        if request.priority == PriorityConfig::default() {
            request.priority = self.config.priority;
        }
        Ok(self
            .transactions
            .send_transaction_with_retry(wallet, request, None)
            .await?)
    }

    pub async fn send_legacy_transaction(
        &self,
        wallet: &dyn WalletAdapter,
        transaction: Transaction,
    ) -> Result<TransactionReceipt, SonicError> {
        Ok(self
            .transactions
            .send_legacy_transaction(wallet, transaction, None, None)
            .await?)
    }

    pub async fn send_versioned_transaction(
        &self,
        wallet: &dyn WalletAdapter,
        transaction: VersionedTransaction,
    ) -> Result<TransactionReceipt, SonicError> {
        Ok(self
            .transactions
            .send_versioned_transaction(wallet, transaction, None, None)
            .await?)
    }

    /// Sign a batch and submit it on the configured stagger
    pub async fn send_batch(
        &self,
        wallet: &dyn WalletAdapter,
        transactions: Vec<VersionedTransaction>,
    ) -> Result<Vec<BatchSettlement>, SonicError> {
        Ok(self
            .queue
            .queue_versioned_transaction_sign(wallet, transactions)
            .await?)
    }

    pub async fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<ConfirmationStatus, SonicError> {
        Ok(self
            .transactions
            .confirm_transaction(signature, commitment)
            .await?)
    }

    pub async fn get_transaction_fee(&self, signature: &Signature) -> Result<u64, SonicError> {
        Ok(self.transactions.get_transaction_fee(signature).await?)
    }

    /// Explorer link for a signature on the configured cluster
    pub fn explorer_url(&self, signature: &Signature) -> String {
        util::common::explorer_url(
            &self.config.network.explorer_url,
            &signature.to_string(),
            &self.config.network.cluster,
        )
    }
}

/// Error types for client operations
#[derive(Error, Debug)]
pub enum SonicError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Confirmation error: {0}")]
    Confirmation(#[from] ConfirmationError),

    #[error("Submission error: {0}")]
    Submit(#[from] SubmitError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl SonicError {
    /// Outcome class for presentation; non-submission errors are `Other`
    pub fn kind(&self) -> FailureKind {
        match self {
            SonicError::Submit(e) => e.kind(),
            SonicError::Wallet(WalletError::Rejected) => FailureKind::WalletDeclined,
            SonicError::Confirmation(ConfirmationError::Timeout) => FailureKind::TimedOut,
            SonicError::Confirmation(ConfirmationError::Rejected(_)) => FailureKind::ChainRejected,
            _ => FailureKind::Other,
        }
    }
}

/// Default RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://devnet.sonic.game";

/// Default websocket endpoint
pub const DEFAULT_WS_URL: &str = "wss://devnet.sonic.game";

/// Default explorer base
pub const DEFAULT_EXPLORER_URL: &str = "https://explorer.sonic.game";

/// Cluster name passed to the explorer
pub const DEFAULT_CLUSTER: &str = "devnet";
