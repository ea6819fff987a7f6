//! Transaction submission for the Sonic client
//!
//! Builds, signs, broadcasts and confirms transactions. Every submission ends
//! in exactly one receipt or one typed [`SubmitError`].

pub mod builder;

pub use builder::{PriorityConfig, priority_fee_instruction};

use crate::broadcast::{BroadcastConfig, BroadcastLoop, BroadcastReport};
use crate::confirmation::{
    await_signature_confirmation, CompletionLatch, ConfirmationError, ConfirmationOptions,
    ConfirmationStatus,
};
use crate::network::{Commitment, Connection, NetworkError, SendOptions};
use crate::util::round_latency;
use crate::wallet::{partial_sign, WalletAdapter, WalletError};
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::{Transaction, TransactionError, VersionedTransaction},
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior};

/// Timing and commitment defaults for every submission
#[derive(Debug, Clone)]
pub struct SubmitSettings {
    /// Default commitment for built and presigned versioned transactions
    pub commitment: Commitment,
    /// Default commitment for legacy transactions
    pub legacy_commitment: Commitment,
    pub timeout: Duration,
    pub rebroadcast_interval: Duration,
    pub query_status: bool,
    pub status_poll_interval: Duration,
    /// Pause between building a message and asking the wallet to sign it
    pub pre_sign_delay: Duration,
    pub diagnostics_capacity: usize,
}

impl Default for SubmitSettings {
    fn default() -> Self {
        Self {
            commitment: Commitment::Confirmed,
            legacy_commitment: Commitment::Processed,
            timeout: crate::confirmation::DEFAULT_TIMEOUT,
            rebroadcast_interval: crate::broadcast::DEFAULT_REBROADCAST_INTERVAL,
            query_status: false,
            status_poll_interval: crate::confirmation::DEFAULT_POLL_INTERVAL,
            pre_sign_delay: Duration::from_millis(1_000),
            diagnostics_capacity: crate::broadcast::diagnostics::DEFAULT_CAPACITY,
        }
    }
}

impl SubmitSettings {
    fn confirmation_options(&self, commitment: Commitment) -> ConfirmationOptions {
        ConfirmationOptions {
            timeout: self.timeout,
            commitment,
            query_status: self.query_status,
            poll_interval: self.status_poll_interval,
        }
    }

    fn broadcast_config(&self) -> BroadcastConfig {
        BroadcastConfig {
            interval: self.rebroadcast_interval,
            timeout: self.timeout,
            diagnostics_capacity: self.diagnostics_capacity,
        }
    }
}

/// Instructions and options for a built, priority-fee submission
#[derive(Debug, Default)]
pub struct SubmitRequest {
    pub instructions: Vec<Instruction>,
    /// Extra signers applied before the wallet signs
    pub signers: Vec<Keypair>,
    pub priority: PriorityConfig,
    /// Overrides the service default when set
    pub commitment: Option<Commitment>,
    /// The first extra signer pays fees instead of the wallet
    pub includes_fee_payer: bool,
    /// Lookup tables to compile against, in addition to any the message references
    pub lookup_tables: Vec<Pubkey>,
}

impl SubmitRequest {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: PriorityConfig) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_commitment(mut self, commitment: Commitment) -> Self {
        self.commitment = Some(commitment);
        self
    }

    pub fn with_signer(mut self, signer: Keypair) -> Self {
        self.signers.push(signer);
        self
    }

    pub fn with_lookup_table(mut self, table: Pubkey) -> Self {
        self.lookup_tables.push(table);
        self
    }

    pub fn fee_payer_included(mut self, included: bool) -> Self {
        self.includes_fee_payer = included;
        self
    }
}

/// Outcome of a confirmed submission
#[derive(Debug, Clone)]
pub struct TransactionReceipt {
    /// Signature returned by the initial broadcast
    pub signature: Signature,
    pub slot: u64,
    /// Seconds from just before the initial broadcast to confirmation
    pub latency_seconds: f64,
    pub broadcast: BroadcastReport,
}

impl fmt::Display for TransactionReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} confirmed in slot {} after {:.3}s",
            self.signature, self.slot, self.latency_seconds
        )
    }
}

/// User-visible outcome class of a failed submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ChainRejected,
    TimedOut,
    WalletDeclined,
    Other,
}

/// Error types for transaction submission
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Signing failed: {0}")]
    Signing(WalletError),

    #[error("Broadcast failed: {0}")]
    Broadcast(NetworkError),

    #[error("Transaction {signature} failed in slot {slot}: {error:?}")]
    TransactionFailed {
        signature: Signature,
        slot: u64,
        error: Option<TransactionError>,
    },

    #[error("Timed out awaiting confirmation of {signature}")]
    Timeout { signature: Signature },

    #[error("Failed to build transaction: {0}")]
    Build(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Blockhash expired before {signature} was confirmed")]
    BlockhashExpired { signature: Signature },
}

impl SubmitError {
    /// Outcome class the presentation layer branches on
    pub fn kind(&self) -> FailureKind {
        match self {
            SubmitError::TransactionFailed { .. } => FailureKind::ChainRejected,
            SubmitError::Timeout { .. } | SubmitError::BlockhashExpired { .. } => {
                FailureKind::TimedOut
            }
            SubmitError::WalletNotConnected | SubmitError::Signing(_) => {
                FailureKind::WalletDeclined
            }
            SubmitError::Broadcast(_) | SubmitError::Build(_) | SubmitError::Network(_) => {
                FailureKind::Other
            }
        }
    }

    /// Signature of the broadcast transaction, when one was sent
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            SubmitError::TransactionFailed { signature, .. }
            | SubmitError::Timeout { signature }
            | SubmitError::BlockhashExpired { signature } => Some(signature),
            _ => None,
        }
    }
}

/// Submission pipeline bound to one connection
pub struct TransactionService {
    connection: Arc<dyn Connection>,
    settings: SubmitSettings,
}

impl TransactionService {
    pub fn new(connection: Arc<dyn Connection>, settings: SubmitSettings) -> Self {
        Self {
            connection,
            settings,
        }
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn settings(&self) -> &SubmitSettings {
        &self.settings
    }

    /// Build a v0 transaction with compute-budget instructions, sign it
    /// with the wallet and submit it with rebroadcasting
    pub async fn send_transaction_with_retry(
        &self,
        wallet: &dyn WalletAdapter,
        request: SubmitRequest,
        before_send: Option<&(dyn Fn() + Send + Sync)>,
    ) -> Result<TransactionReceipt, SubmitError> {
        let wallet_key = wallet.public_key().ok_or(SubmitError::WalletNotConnected)?;
        let commitment = request.commitment.unwrap_or(self.settings.commitment);

        let payer = if request.includes_fee_payer {
            request
                .signers
                .first()
                .map(|signer| signer.pubkey())
                .ok_or_else(|| SubmitError::Build("fee payer signer missing".to_string()))?
        } else {
            wallet_key
        };

        let instructions = builder::compose_instructions(&request.priority, request.instructions);
        let latest = self.connection.get_latest_blockhash(commitment).await?;
        tracing::debug!(
            "Building transaction with {} instructions on blockhash {}",
            instructions.len(),
            latest.blockhash
        );

        let mut transaction = builder::build_versioned_transaction(
            self.connection.as_ref(),
            &payer,
            &instructions,
            &request.lookup_tables,
            latest.blockhash,
        )
        .await?;

        for signer in &request.signers {
            partial_sign(&mut transaction, signer).map_err(SubmitError::Signing)?;
        }

        tokio::time::sleep(self.settings.pre_sign_delay).await;

        let signed = wallet
            .sign_transaction(transaction)
            .await
            .map_err(SubmitError::Signing)?;

        if let Some(before_send) = before_send {
            before_send();
        }

        self.send_signed_transaction(&signed, commitment).await
    }

    /// Sign and submit a legacy transaction; defaults to the legacy commitment
    pub async fn send_legacy_transaction(
        &self,
        wallet: &dyn WalletAdapter,
        transaction: Transaction,
        commitment: Option<Commitment>,
        before_send: Option<&(dyn Fn() + Send + Sync)>,
    ) -> Result<TransactionReceipt, SubmitError> {
        let commitment = commitment.unwrap_or(self.settings.legacy_commitment);
        self.sign_and_send(wallet, VersionedTransaction::from(transaction), commitment, before_send)
            .await
    }

    /// Sign and submit an already compiled versioned transaction
    pub async fn send_versioned_transaction(
        &self,
        wallet: &dyn WalletAdapter,
        transaction: VersionedTransaction,
        commitment: Option<Commitment>,
        before_send: Option<&(dyn Fn() + Send + Sync)>,
    ) -> Result<TransactionReceipt, SubmitError> {
        let commitment = commitment.unwrap_or(self.settings.commitment);
        self.sign_and_send(wallet, transaction, commitment, before_send)
            .await
    }

    async fn sign_and_send(
        &self,
        wallet: &dyn WalletAdapter,
        transaction: VersionedTransaction,
        commitment: Commitment,
        before_send: Option<&(dyn Fn() + Send + Sync)>,
    ) -> Result<TransactionReceipt, SubmitError> {
        if wallet.public_key().is_none() {
            return Err(SubmitError::WalletNotConnected);
        }

        let signed = wallet
            .sign_transaction(transaction)
            .await
            .map_err(SubmitError::Signing)?;

        if let Some(before_send) = before_send {
            before_send();
        }

        self.send_signed_transaction(&signed, commitment).await
    }

    /// Broadcast signed bytes, rebroadcast until settled and await confirmation
    pub async fn send_signed_transaction(
        &self,
        signed: &VersionedTransaction,
        commitment: Commitment,
    ) -> Result<TransactionReceipt, SubmitError> {
        let wire_transaction = bincode::serialize(signed)
            .map_err(|e| SubmitError::Build(format!("Failed to serialize transaction: {}", e)))?;

        let start = Instant::now();
        let signature = self
            .connection
            .send_raw_transaction(&wire_transaction, SendOptions::skip_preflight())
            .await
            .map_err(SubmitError::Broadcast)?;
        tracing::info!("📤 Started awaiting confirmation for {}", signature);

        let latch = CompletionLatch::new();
        let broadcast = BroadcastLoop::spawn(
            Arc::clone(&self.connection),
            Arc::new(wire_transaction),
            self.settings.broadcast_config(),
            latch.clone(),
        );

        let confirmation = await_signature_confirmation(
            &self.connection,
            &signature,
            &self.settings.confirmation_options(commitment),
            &latch,
        )
        .await;
        let latency_seconds = round_latency(start.elapsed());
        latch.try_complete();
        let report = broadcast.join().await;

        match confirmation {
            Ok(status) => {
                tracing::info!(
                    "✅ {} confirmed in slot {} ({:.3}s, {} rebroadcasts)",
                    signature,
                    status.slot,
                    latency_seconds,
                    report.attempts
                );
                Ok(TransactionReceipt {
                    signature,
                    slot: status.slot,
                    latency_seconds,
                    broadcast: report,
                })
            }
            Err(ConfirmationError::Rejected(status)) => {
                tracing::warn!("❌ {} failed: {:?}", signature, status.err);
                Err(SubmitError::TransactionFailed {
                    signature,
                    slot: status.slot,
                    error: status.err,
                })
            }
            Err(ConfirmationError::Timeout) => {
                tracing::warn!(
                    "⏱️ {} timed out after {} rebroadcasts ({} failed)",
                    signature,
                    report.attempts,
                    report.failures()
                );
                Err(SubmitError::Timeout { signature })
            }
        }
    }

    /// Wait until `signature` reaches `commitment` or its blockhash expires
    pub async fn confirm_transaction(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<ConfirmationStatus, SubmitError> {
        let latest = self.connection.get_latest_blockhash(commitment).await?;
        let mut ticker = tokio::time::interval(self.settings.status_poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.connection.get_signature_statuses(&[*signature]).await {
                Ok(statuses) => match statuses.into_iter().next().flatten() {
                    Some(status) if status.err.is_some() => {
                        return Err(SubmitError::TransactionFailed {
                            signature: *signature,
                            slot: status.slot,
                            error: status.err,
                        });
                    }
                    Some(status) if status.satisfies(commitment) => {
                        tracing::debug!("{} reached {} in slot {}", signature, commitment, status.slot);
                        return Ok(status.into());
                    }
                    _ => {}
                },
                Err(e) => tracing::warn!("Status lookup failed for {}: {}", signature, e),
            }

            let height = self.connection.get_block_height(commitment).await?;
            if height > latest.last_valid_block_height {
                tracing::warn!(
                    "Blockhash expired at height {} (valid through {})",
                    height,
                    latest.last_valid_block_height
                );
                return Err(SubmitError::BlockhashExpired {
                    signature: *signature,
                });
            }
        }
    }

    /// Fee paid by a landed transaction; zero when it cannot be found
    pub async fn get_transaction_fee(&self, signature: &Signature) -> Result<u64, SubmitError> {
        Ok(self
            .connection
            .get_transaction_fee(signature)
            .await?
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::memory::{PushBehavior, ScriptedConnection};
    use crate::network::{SignatureNotification, SignatureStatus};
    use crate::wallet::KeypairWallet;
    use parking_lot::Mutex;
    use solana_sdk::{
        compute_budget::{self, ComputeBudgetInstruction},
        hash::Hash,
        instruction::InstructionError,
        system_instruction,
    };

    fn service(scripted: &Arc<ScriptedConnection>) -> TransactionService {
        TransactionService::new(scripted.clone(), SubmitSettings::default())
    }

    async fn connected_wallet() -> KeypairWallet {
        let wallet = KeypairWallet::new(Keypair::new());
        wallet.connect().await.unwrap();
        wallet
    }

    fn transfer_from(wallet: &KeypairWallet) -> Instruction {
        system_instruction::transfer(&wallet.pubkey(), &Pubkey::new_unique(), 1_000)
    }

    fn push(slot: u64, err: Option<TransactionError>) -> PushBehavior {
        PushBehavior::Immediate(SignatureNotification { slot, err })
    }

    #[tokio::test(start_paused = true)]
    async fn test_priority_submission_receipt() {
        let scripted = Arc::new(ScriptedConnection::new().with_push(push(42, None)));
        let wallet = connected_wallet().await;
        let request = SubmitRequest::new(vec![transfer_from(&wallet)])
            .with_priority(PriorityConfig::new(400_000, 500));

        let receipt = service(&scripted)
            .send_transaction_with_retry(&wallet, request, None)
            .await
            .unwrap();

        assert_eq!(receipt.slot, 42);
        assert!(receipt.latency_seconds >= 0.0);
        let sent = scripted.sent();
        assert_eq!(sent[0].signature, receipt.signature);
        assert_eq!(scripted.removed_listeners().len(), 1);
        assert_eq!(scripted.subscriptions()[0].1, Commitment::Confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_built_message_layout() {
        let scripted = Arc::new(ScriptedConnection::new().with_push(push(1, None)));
        let wallet = connected_wallet().await;
        let request = SubmitRequest::new(vec![transfer_from(&wallet)])
            .with_priority(PriorityConfig::new(200_000, 25));

        service(&scripted)
            .send_transaction_with_retry(&wallet, request, None)
            .await
            .unwrap();

        let tx = scripted.sent()[0].transaction().unwrap();
        assert!(tx.verify_with_results().iter().all(|ok| *ok));
        let keys = tx.message.static_account_keys();
        let programs: Vec<Pubkey> = tx
            .message
            .instructions()
            .iter()
            .map(|ix| keys[usize::from(ix.program_id_index)])
            .collect();
        assert_eq!(
            programs,
            vec![
                compute_budget::id(),
                compute_budget::id(),
                solana_sdk::system_program::id()
            ]
        );
        assert_eq!(
            tx.message.instructions()[0].data,
            ComputeBudgetInstruction::set_compute_unit_limit(200_000).data
        );
        assert_eq!(
            tx.message.instructions()[1].data,
            ComputeBudgetInstruction::set_compute_unit_price(25).data
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_before_send_runs_once_after_signing() {
        let scripted = Arc::new(ScriptedConnection::new().with_push(push(5, None)));
        let wallet = connected_wallet().await;
        let calls = Arc::new(Mutex::new(0u32));
        let counter = Arc::clone(&calls);
        let hook = move || *counter.lock() += 1;

        service(&scripted)
            .send_transaction_with_retry(
                &wallet,
                SubmitRequest::new(vec![transfer_from(&wallet)]),
                Some(&hook),
            )
            .await
            .unwrap();

        assert_eq!(*calls.lock(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pre_sign_delay_precedes_broadcast() {
        let scripted = Arc::new(ScriptedConnection::new().with_push(push(5, None)));
        let wallet = connected_wallet().await;
        let start = Instant::now();

        service(&scripted)
            .send_transaction_with_retry(
                &wallet,
                SubmitRequest::new(vec![transfer_from(&wallet)]),
                None,
            )
            .await
            .unwrap();

        assert!(scripted.sent()[0].at - start >= Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnected_wallet_fails_fast() {
        let scripted = Arc::new(ScriptedConnection::new());
        let wallet = KeypairWallet::new(Keypair::new());

        let result = service(&scripted)
            .send_transaction_with_retry(
                &wallet,
                SubmitRequest::new(vec![transfer_from(&wallet)]),
                None,
            )
            .await;

        assert_eq!(result.unwrap_err(), SubmitError::WalletNotConnected);
        assert!(scripted.sent().is_empty());
        assert!(scripted.subscriptions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wallet_rejection_is_not_retried() {
        let scripted = Arc::new(ScriptedConnection::new());
        let wallet = connected_wallet().await;
        wallet.set_reject_all(true);

        let err = service(&scripted)
            .send_transaction_with_retry(
                &wallet,
                SubmitRequest::new(vec![transfer_from(&wallet)]),
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(err, SubmitError::Signing(WalletError::Rejected));
        assert_eq!(err.kind(), FailureKind::WalletDeclined);
        assert!(scripted.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_chain_rejection_maps_to_transaction_failed() {
        let err = TransactionError::InstructionError(1, InstructionError::Custom(6000));
        let scripted = Arc::new(ScriptedConnection::new().with_push(push(88, Some(err.clone()))));
        let wallet = connected_wallet().await;

        let failure = service(&scripted)
            .send_transaction_with_retry(
                &wallet,
                SubmitRequest::new(vec![transfer_from(&wallet)]),
                None,
            )
            .await
            .unwrap_err();

        match &failure {
            SubmitError::TransactionFailed { slot, error, .. } => {
                assert_eq!(*slot, 88);
                assert_eq!(error.as_ref(), Some(&err));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(failure.kind(), FailureKind::ChainRejected);
        assert_eq!(failure.signature(), Some(&scripted.sent()[0].signature));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_rebroadcasting_until_deadline() {
        let scripted = Arc::new(ScriptedConnection::new());
        let wallet = connected_wallet().await;
        let settings = SubmitSettings {
            timeout: Duration::from_secs(3),
            pre_sign_delay: Duration::ZERO,
            ..SubmitSettings::default()
        };

        let failure = TransactionService::new(scripted.clone(), settings)
            .send_transaction_with_retry(
                &wallet,
                SubmitRequest::new(vec![transfer_from(&wallet)]),
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(failure, SubmitError::Timeout { .. }));
        assert_eq!(failure.kind(), FailureKind::TimedOut);
        // initial send plus rebroadcasts at 0, 0.5, ... 2.5s
        assert_eq!(scripted.sent().len(), 7);
        assert_eq!(scripted.removed_listeners().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_broadcast_failure_is_authoritative() {
        let scripted = Arc::new(ScriptedConnection::new());
        scripted.script_send(Err(NetworkError::Rpc("connection refused".to_string())));
        let wallet = connected_wallet().await;

        let failure = service(&scripted)
            .send_transaction_with_retry(
                &wallet,
                SubmitRequest::new(vec![transfer_from(&wallet)]),
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(failure, SubmitError::Broadcast(_)));
        assert!(scripted.subscriptions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_extra_signer_as_fee_payer() {
        let scripted = Arc::new(ScriptedConnection::new().with_push(push(3, None)));
        let wallet = connected_wallet().await;
        let fee_payer = Keypair::new();
        let fee_payer_key = fee_payer.pubkey();
        let ix = system_instruction::transfer(&wallet.pubkey(), &Pubkey::new_unique(), 10);

        let receipt = service(&scripted)
            .send_transaction_with_retry(
                &wallet,
                SubmitRequest::new(vec![ix])
                    .with_signer(fee_payer)
                    .fee_payer_included(true),
                None,
            )
            .await
            .unwrap();

        let tx = scripted.sent()[0].transaction().unwrap();
        assert_eq!(tx.message.static_account_keys()[0], fee_payer_key);
        assert_eq!(tx.signatures.len(), 2);
        assert!(tx.verify_with_results().iter().all(|ok| *ok));
        assert_eq!(receipt.signature, tx.signatures[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_legacy_defaults_to_processed() {
        let scripted = Arc::new(ScriptedConnection::new().with_push(push(12, None)));
        let wallet = connected_wallet().await;
        let tx = Transaction::new_with_payer(&[transfer_from(&wallet)], Some(&wallet.pubkey()));

        let receipt = service(&scripted)
            .send_legacy_transaction(&wallet, tx, None, None)
            .await
            .unwrap();

        assert_eq!(receipt.slot, 12);
        assert_eq!(scripted.subscriptions()[0].1, Commitment::Processed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_presigned_versioned_defaults_to_confirmed() {
        let scripted = Arc::new(ScriptedConnection::new().with_push(push(13, None)));
        let wallet = connected_wallet().await;
        let tx = builder::build_versioned_transaction(
            scripted.as_ref(),
            &wallet.pubkey(),
            &[transfer_from(&wallet)],
            &[],
            Hash::new_unique(),
        )
        .await
        .unwrap();

        let receipt = service(&scripted)
            .send_versioned_transaction(&wallet, tx, None, None)
            .await
            .unwrap();

        assert_eq!(receipt.slot, 13);
        assert_eq!(scripted.subscriptions()[0].1, Commitment::Confirmed);
        assert!(receipt.to_string().starts_with(&receipt.signature.to_string()));
        assert!(receipt.to_string().contains("confirmed in slot 13 after"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_transaction_until_commitment() {
        let scripted = Arc::new(ScriptedConnection::new().with_blockhash(Hash::new_unique(), 100));
        scripted.script_block_heights([90]);
        scripted.script_status(Some(SignatureStatus {
            slot: 20,
            confirmations: Some(1),
            err: None,
            confirmation_status: Some(Commitment::Processed),
        }));
        scripted.script_status(Some(SignatureStatus {
            slot: 20,
            confirmations: None,
            err: None,
            confirmation_status: Some(Commitment::Finalized),
        }));

        let status = service(&scripted)
            .confirm_transaction(&Signature::new_unique(), Commitment::Finalized)
            .await
            .unwrap();

        assert_eq!(status.slot, 20);
        assert_eq!(scripted.status_polls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_transaction_blockhash_expiry() {
        let scripted = Arc::new(ScriptedConnection::new().with_blockhash(Hash::new_unique(), 100));
        scripted.script_block_heights([99, 101]);
        let signature = Signature::new_unique();

        let err = service(&scripted)
            .confirm_transaction(&signature, Commitment::Confirmed)
            .await
            .unwrap_err();

        assert_eq!(err, SubmitError::BlockhashExpired { signature });
        assert_eq!(scripted.status_polls().len(), 2);
    }

    #[tokio::test]
    async fn test_transaction_fee_defaults_to_zero() {
        let scripted = Arc::new(ScriptedConnection::new());
        let landed = Signature::new_unique();
        scripted.insert_fee(landed, 5_000);
        let service = service(&scripted);

        assert_eq!(service.get_transaction_fee(&landed).await.unwrap(), 5_000);
        assert_eq!(
            service
                .get_transaction_fee(&Signature::new_unique())
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_submission_stops_rebroadcasting() {
        let scripted = Arc::new(ScriptedConnection::new());
        let wallet = connected_wallet().await;
        let settings = SubmitSettings {
            pre_sign_delay: Duration::ZERO,
            ..SubmitSettings::default()
        };
        let service = TransactionService::new(scripted.clone(), settings);

        let cancelled = tokio::time::timeout(
            Duration::from_secs(2),
            service.send_transaction_with_retry(
                &wallet,
                SubmitRequest::new(vec![transfer_from(&wallet)]),
                None,
            ),
        )
        .await;
        assert!(cancelled.is_err());
        let sent_at_drop = scripted.sent().len();

        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(sent_at_drop > 1);
        assert_eq!(scripted.sent().len(), sent_at_drop);
        assert_eq!(scripted.removed_listeners().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_runs_to_confirmation() {
        let scripted = Arc::new(ScriptedConnection::new().with_push(PushBehavior::Delayed(
            Duration::from_millis(1_500),
            SignatureNotification { slot: 12, err: None },
        )));
        let wallet = connected_wallet().await;
        let settings = SubmitSettings {
            pre_sign_delay: Duration::ZERO,
            ..SubmitSettings::default()
        };

        let receipt = TransactionService::new(scripted.clone(), settings)
            .send_transaction_with_retry(
                &wallet,
                SubmitRequest::new(vec![transfer_from(&wallet)]),
                None,
            )
            .await
            .unwrap();

        assert_eq!(receipt.slot, 12);
        assert_eq!(receipt.latency_seconds, 1.5);
    }
}
