//! Scripted in-memory cluster
//!
//! Replays canned responses and records every call so the pipeline can be
//! exercised deterministically, without a node.

use super::{
    BlockhashInfo, Commitment, Connection, NetworkError, SendOptions, SignatureNotification,
    SignatureStatus, SignatureSubscription, SubscriptionId,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{
    hash::Hash, pubkey::Pubkey, signature::Signature, transaction::VersionedTransaction,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// How the push source behaves for a watched signature
#[derive(Debug, Clone)]
pub enum PushBehavior {
    /// Never notify; the registration stays open until released
    Silent,
    /// Notify as soon as the registration is made
    Immediate(SignatureNotification),
    /// Notify after the given delay
    Delayed(Duration, SignatureNotification),
    /// Fail the registration itself
    FailSetup(String),
    /// Never answer the registration request
    Stall,
}

/// One recorded broadcast
#[derive(Debug, Clone)]
pub struct SentTransaction {
    pub signature: Signature,
    pub at: Instant,
    pub skip_preflight: bool,
    pub wire_transaction: Vec<u8>,
}

impl SentTransaction {
    /// Decode the broadcast bytes
    pub fn transaction(&self) -> Option<VersionedTransaction> {
        bincode::deserialize(&self.wire_transaction).ok()
    }
}

/// Scripted connection used by tests and offline demos
pub struct ScriptedConnection {
    blockhash: BlockhashInfo,
    block_heights: Mutex<VecDeque<u64>>,
    send_script: Mutex<VecDeque<Result<Signature, NetworkError>>>,
    status_script: Mutex<VecDeque<Result<Option<SignatureStatus>, NetworkError>>>,
    default_push: Mutex<PushBehavior>,
    push_by_signature: Mutex<HashMap<Signature, PushBehavior>>,
    accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
    fees: Mutex<HashMap<Signature, u64>>,
    open_listeners: Mutex<HashMap<SubscriptionId, Option<oneshot::Sender<SignatureNotification>>>>,
    next_subscription: AtomicU64,
    sent: Mutex<Vec<SentTransaction>>,
    status_polls: Mutex<Vec<Instant>>,
    subscribed: Mutex<Vec<(Signature, Commitment)>>,
    removed: Mutex<Vec<SubscriptionId>>,
    account_fetches: Mutex<Vec<Pubkey>>,
}

impl ScriptedConnection {
    /// Create a connection whose push source never fires
    pub fn new() -> Self {
        Self {
            blockhash: BlockhashInfo {
                blockhash: Hash::new_unique(),
                last_valid_block_height: 1_000,
            },
            block_heights: Mutex::new(VecDeque::new()),
            send_script: Mutex::new(VecDeque::new()),
            status_script: Mutex::new(VecDeque::new()),
            default_push: Mutex::new(PushBehavior::Silent),
            push_by_signature: Mutex::new(HashMap::new()),
            accounts: Mutex::new(HashMap::new()),
            fees: Mutex::new(HashMap::new()),
            open_listeners: Mutex::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
            sent: Mutex::new(Vec::new()),
            status_polls: Mutex::new(Vec::new()),
            subscribed: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            account_fetches: Mutex::new(Vec::new()),
        }
    }

    /// Set the block reference handed out by `get_latest_blockhash`
    pub fn with_blockhash(mut self, blockhash: Hash, last_valid_block_height: u64) -> Self {
        self.blockhash = BlockhashInfo {
            blockhash,
            last_valid_block_height,
        };
        self
    }

    /// Push behavior for every signature without a specific override
    pub fn with_push(self, behavior: PushBehavior) -> Self {
        *self.default_push.lock() = behavior;
        self
    }

    /// Push behavior for one signature
    pub fn push_for(&self, signature: Signature, behavior: PushBehavior) {
        self.push_by_signature.lock().insert(signature, behavior);
    }

    /// Queue the result of the next send; unscripted sends echo the transaction signature
    pub fn script_send(&self, result: Result<Signature, NetworkError>) {
        self.send_script.lock().push_back(result);
    }

    /// Queue the result of the next status poll; unscripted polls see no status
    pub fn script_status(&self, status: Option<SignatureStatus>) {
        self.status_script.lock().push_back(Ok(status));
    }

    /// Make the next status poll fail
    pub fn script_status_error(&self, error: NetworkError) {
        self.status_script.lock().push_back(Err(error));
    }

    /// Queue block heights returned by successive `get_block_height` calls
    pub fn script_block_heights(&self, heights: impl IntoIterator<Item = u64>) {
        self.block_heights.lock().extend(heights);
    }

    /// Store account data served by `get_account_info`
    pub fn insert_account(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().insert(address, data);
    }

    /// Store the fee reported for a landed transaction
    pub fn insert_fee(&self, signature: Signature, fee: u64) {
        self.fees.lock().insert(signature, fee);
    }

    /// Every broadcast in call order
    pub fn sent(&self) -> Vec<SentTransaction> {
        self.sent.lock().clone()
    }

    /// Timestamps of every status poll
    pub fn status_polls(&self) -> Vec<Instant> {
        self.status_polls.lock().clone()
    }

    /// Every push registration made
    pub fn subscriptions(&self) -> Vec<(Signature, Commitment)> {
        self.subscribed.lock().clone()
    }

    /// Every release call, including repeated ones
    pub fn removed_listeners(&self) -> Vec<SubscriptionId> {
        self.removed.lock().clone()
    }

    /// Every account lookup
    pub fn account_fetches(&self) -> Vec<Pubkey> {
        self.account_fetches.lock().clone()
    }

    fn push_behavior(&self, signature: &Signature) -> PushBehavior {
        self.push_by_signature
            .lock()
            .get(signature)
            .cloned()
            .unwrap_or_else(|| self.default_push.lock().clone())
    }
}

impl Default for ScriptedConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn send_raw_transaction(
        &self,
        wire_transaction: &[u8],
        options: SendOptions,
    ) -> Result<Signature, NetworkError> {
        let scripted = self.send_script.lock().pop_front();
        let result = match scripted {
            Some(result) => result,
            None => bincode::deserialize::<VersionedTransaction>(wire_transaction)
                .map_err(|e| NetworkError::Serialization(e.to_string()))
                .map(|tx| tx.signatures.first().copied().unwrap_or_default()),
        };

        if let Ok(signature) = &result {
            self.sent.lock().push(SentTransaction {
                signature: *signature,
                at: Instant::now(),
                skip_preflight: options.skip_preflight,
                wire_transaction: wire_transaction.to_vec(),
            });
        }
        result
    }

    async fn get_latest_blockhash(
        &self,
        _commitment: Commitment,
    ) -> Result<BlockhashInfo, NetworkError> {
        Ok(self.blockhash)
    }

    async fn get_block_height(&self, _commitment: Commitment) -> Result<u64, NetworkError> {
        let mut heights = self.block_heights.lock();
        let height = if heights.len() > 1 {
            heights.pop_front()
        } else {
            heights.front().copied()
        };
        Ok(height.unwrap_or_default())
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>, NetworkError> {
        self.status_polls.lock().push(Instant::now());
        let next = match self.status_script.lock().pop_front() {
            Some(scripted) => scripted?,
            None => None,
        };
        Ok(signatures.iter().map(|_| next.clone()).collect())
    }

    async fn on_signature(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<SignatureSubscription, NetworkError> {
        let behavior = self.push_behavior(signature);
        match &behavior {
            PushBehavior::FailSetup(message) => {
                return Err(NetworkError::Subscription(message.clone()));
            }
            PushBehavior::Stall => return std::future::pending().await,
            _ => {}
        }

        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.subscribed.lock().push((*signature, commitment));
        let (sender, notification) = oneshot::channel();

        match behavior {
            PushBehavior::Immediate(event) => {
                let _ = sender.send(event);
                self.open_listeners.lock().insert(id, None);
            }
            PushBehavior::Delayed(delay, event) => {
                self.open_listeners.lock().insert(id, None);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = sender.send(event);
                });
            }
            PushBehavior::Silent | PushBehavior::FailSetup(_) | PushBehavior::Stall => {
                self.open_listeners.lock().insert(id, Some(sender));
            }
        }

        Ok(SignatureSubscription { id, notification })
    }

    async fn remove_signature_listener(&self, id: SubscriptionId) -> Result<(), NetworkError> {
        self.removed.lock().push(id);
        self.open_listeners.lock().remove(&id);
        Ok(())
    }

    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, NetworkError> {
        self.account_fetches.lock().push(*address);
        Ok(self.accounts.lock().get(address).cloned())
    }

    async fn get_transaction_fee(
        &self,
        signature: &Signature,
    ) -> Result<Option<u64>, NetworkError> {
        Ok(self.fees.lock().get(signature).copied())
    }
}
