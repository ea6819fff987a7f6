//! Local keypair wallet
//!
//! Signs with an in-process keypair. Used by the demo binary and tests;
//! browser or hardware wallets implement [`WalletAdapter`] themselves.

use super::{partial_sign, WalletAdapter, WalletError};
use async_trait::async_trait;
use parking_lot::RwLock;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};
use std::path::Path;

/// Wallet backed by a keypair held in memory
pub struct KeypairWallet {
    keypair: Keypair,
    connected: RwLock<bool>,
    sign_all: bool,
    reject_all: RwLock<bool>,
}

impl KeypairWallet {
    /// Wrap an existing keypair; the wallet starts disconnected
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair,
            connected: RwLock::new(false),
            sign_all: false,
            reject_all: RwLock::new(false),
        }
    }

    /// Load a keypair file in the CLI JSON array format
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let path = path.as_ref();
        let contents = std::fs::read(path).map_err(|e| {
            WalletError::Keypair(format!("Failed to read keypair file {}: {}", path.display(), e))
        })?;
        let bytes: Vec<u8> = serde_json::from_slice(&contents)
            .map_err(|e| WalletError::Keypair(format!("Failed to parse keypair JSON: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Decode a base58-encoded 64-byte secret key
    pub fn from_base58(secret: &str) -> Result<Self, WalletError> {
        let bytes = bs58::decode(secret.trim())
            .into_vec()
            .map_err(|e| WalletError::Keypair(format!("Invalid base58 secret key: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        if bytes.len() != 64 {
            return Err(WalletError::Keypair(format!(
                "Invalid keypair length: expected 64 bytes, got {}",
                bytes.len()
            )));
        }
        if bytes.iter().all(|&b| b == 0) {
            return Err(WalletError::Keypair(
                "all-zero key rejected".to_string(),
            ));
        }
        let keypair = Keypair::try_from(bytes)
            .map_err(|e| WalletError::Keypair(format!("Invalid keypair bytes: {}", e)))?;
        Ok(Self::new(keypair))
    }

    /// Advertise batch signing
    pub fn with_sign_all(mut self, enabled: bool) -> Self {
        self.sign_all = enabled;
        self
    }

    /// Make every later signing request fail as if the user declined it
    pub fn set_reject_all(&self, reject: bool) {
        *self.reject_all.write() = reject;
    }

    /// Public key regardless of connection state
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    fn ensure_ready(&self) -> Result<(), WalletError> {
        if !*self.connected.read() {
            return Err(WalletError::NotConnected);
        }
        if *self.reject_all.read() {
            return Err(WalletError::Rejected);
        }
        Ok(())
    }
}

#[async_trait]
impl WalletAdapter for KeypairWallet {
    fn name(&self) -> &str {
        "Keypair"
    }

    fn public_key(&self) -> Option<Pubkey> {
        (*self.connected.read()).then(|| self.keypair.pubkey())
    }

    async fn connect(&self) -> Result<Pubkey, WalletError> {
        *self.connected.write() = true;
        tracing::info!("🔑 Wallet connected: {}", self.keypair.pubkey());
        Ok(self.keypair.pubkey())
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        *self.connected.write() = false;
        tracing::info!("Wallet disconnected");
        Ok(())
    }

    async fn sign_transaction(
        &self,
        mut transaction: VersionedTransaction,
    ) -> Result<VersionedTransaction, WalletError> {
        self.ensure_ready()?;
        partial_sign(&mut transaction, &self.keypair)?;
        Ok(transaction)
    }

    fn supports_sign_all(&self) -> bool {
        self.sign_all
    }

    async fn sign_all_transactions(
        &self,
        transactions: Vec<VersionedTransaction>,
    ) -> Result<Vec<VersionedTransaction>, WalletError> {
        if !self.sign_all {
            return Err(WalletError::Unsupported("sign_all_transactions"));
        }
        self.ensure_ready()?;
        transactions
            .into_iter()
            .map(|mut transaction| {
                partial_sign(&mut transaction, &self.keypair)?;
                Ok(transaction)
            })
            .collect()
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, WalletError> {
        self.ensure_ready()?;
        Ok(self.keypair.sign_message(message))
    }
}
