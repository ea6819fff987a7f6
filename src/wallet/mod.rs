//! Wallet adapter boundary
//!
//! The submission pipeline never holds user keys. It asks a [`WalletAdapter`]
//! for signatures and treats a refusal as a signing failure.

pub mod keypair;

pub use keypair::KeypairWallet;

use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Signature, Signer},
    transaction::VersionedTransaction,
};
use thiserror::Error;

/// External signer holding the user's keys
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Public key of the connected account, if any
    fn public_key(&self) -> Option<Pubkey>;

    /// Whether the adapter is connected
    fn connected(&self) -> bool {
        self.public_key().is_some()
    }

    /// Connect and return the account public key
    async fn connect(&self) -> Result<Pubkey, WalletError>;

    /// Drop the connection
    async fn disconnect(&self) -> Result<(), WalletError>;

    /// Sign one transaction, returning the signed copy
    async fn sign_transaction(
        &self,
        transaction: VersionedTransaction,
    ) -> Result<VersionedTransaction, WalletError>;

    /// Whether [`WalletAdapter::sign_all_transactions`] is available
    fn supports_sign_all(&self) -> bool {
        false
    }

    /// Sign a batch in one user interaction
    async fn sign_all_transactions(
        &self,
        _transactions: Vec<VersionedTransaction>,
    ) -> Result<Vec<VersionedTransaction>, WalletError> {
        Err(WalletError::Unsupported("sign_all_transactions"))
    }

    /// Sign arbitrary bytes
    async fn sign_message(&self, message: &[u8]) -> Result<Signature, WalletError>;
}

/// Error types for wallet operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Wallet not connected")]
    NotConnected,

    #[error("Wallet not ready: {0}")]
    NotReady(String),

    #[error("User rejected the request")]
    Rejected,

    #[error("Failed to sign transaction: {0}")]
    SignTransaction(String),

    #[error("Signer {0} is not a required signer of this transaction")]
    MissingSigner(Pubkey),

    #[error("Operation not supported by this wallet: {0}")]
    Unsupported(&'static str),

    #[error("Keypair error: {0}")]
    Keypair(String),
}

/// Add `signer`'s signature in its slot among the required signers
///
/// Signatures already present for other signers are left untouched.
pub fn partial_sign(
    transaction: &mut VersionedTransaction,
    signer: &dyn Signer,
) -> Result<(), WalletError> {
    let required = usize::from(transaction.message.header().num_required_signatures);
    let pubkey = signer.pubkey();
    let index = transaction
        .message
        .static_account_keys()
        .iter()
        .take(required)
        .position(|key| *key == pubkey)
        .ok_or(WalletError::MissingSigner(pubkey))?;

    if transaction.signatures.len() < required {
        transaction
            .signatures
            .resize(required, Signature::default());
    }

    let signature = signer
        .try_sign_message(&transaction.message.serialize())
        .map_err(|e| WalletError::SignTransaction(e.to_string()))?;
    transaction.signatures[index] = signature;
    Ok(())
}
