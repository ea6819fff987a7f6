//! JSON-RPC and websocket backed connection
//!
//! Requests go through the nonblocking `RpcClient`. Signature notifications
//! use a lazily opened `PubsubClient`, one spawned task per registration.

use super::{
    BlockhashInfo, Commitment, Connection, NetworkError, SendOptions, SignatureNotification,
    SignatureStatus, SignatureSubscription, SubscriptionId,
};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use solana_client::{
    nonblocking::{pubsub_client::PubsubClient, rpc_client::RpcClient},
    rpc_config::{RpcSendTransactionConfig, RpcSignatureSubscribeConfig, RpcTransactionConfig},
    rpc_request::RpcRequest,
    rpc_response::RpcSignatureResult,
};
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, TransactionConfirmationStatus,
    UiTransactionEncoding,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, OnceCell};
use tokio_util::sync::CancellationToken;

/// Connection to a live cluster over HTTP and websocket
pub struct RpcConnection {
    rpc: RpcClient,
    ws_url: String,
    pubsub: OnceCell<Arc<PubsubClient>>,
    listeners: Mutex<HashMap<SubscriptionId, CancellationToken>>,
    next_id: AtomicU64,
}

impl RpcConnection {
    /// Create a connection; the websocket is opened on first registration
    pub fn new(rpc_url: &str, ws_url: &str, commitment: Commitment) -> Self {
        tracing::info!("Connecting to RPC at {} (ws {})", rpc_url, ws_url);
        Self {
            rpc: RpcClient::new_with_commitment(rpc_url.to_string(), commitment.into()),
            ws_url: ws_url.to_string(),
            pubsub: OnceCell::new(),
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Underlying RPC client
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    async fn pubsub(&self) -> Result<Arc<PubsubClient>, NetworkError> {
        self.pubsub
            .get_or_try_init(|| async {
                tracing::debug!("Opening websocket {}", self.ws_url);
                PubsubClient::new(&self.ws_url)
                    .await
                    .map(Arc::new)
                    .map_err(|e| NetworkError::Subscription(e.to_string()))
            })
            .await
            .cloned()
    }
}

fn rpc_error(error: impl std::fmt::Display) -> NetworkError {
    NetworkError::Rpc(error.to_string())
}

fn commitment_of(status: &TransactionConfirmationStatus) -> Commitment {
    match status {
        TransactionConfirmationStatus::Processed => Commitment::Processed,
        TransactionConfirmationStatus::Confirmed => Commitment::Confirmed,
        TransactionConfirmationStatus::Finalized => Commitment::Finalized,
    }
}

#[async_trait]
impl Connection for RpcConnection {
    async fn send_raw_transaction(
        &self,
        wire_transaction: &[u8],
        options: SendOptions,
    ) -> Result<Signature, NetworkError> {
        let transaction: VersionedTransaction = bincode::deserialize(wire_transaction)
            .map_err(|e| NetworkError::Serialization(e.to_string()))?;

        let config = RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            encoding: Some(UiTransactionEncoding::Base64),
            max_retries: options.max_retries,
            ..RpcSendTransactionConfig::default()
        };

        self.rpc
            .send_transaction_with_config(&transaction, config)
            .await
            .map_err(rpc_error)
    }

    async fn get_latest_blockhash(
        &self,
        commitment: Commitment,
    ) -> Result<BlockhashInfo, NetworkError> {
        let (blockhash, last_valid_block_height) = self
            .rpc
            .get_latest_blockhash_with_commitment(commitment.into())
            .await
            .map_err(rpc_error)?;
        Ok(BlockhashInfo {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn get_block_height(&self, commitment: Commitment) -> Result<u64, NetworkError> {
        self.rpc
            .get_block_height_with_commitment(commitment.into())
            .await
            .map_err(rpc_error)
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>, NetworkError> {
        let response = self
            .rpc
            .get_signature_statuses(signatures)
            .await
            .map_err(rpc_error)?;

        Ok(response
            .value
            .into_iter()
            .map(|status| {
                status.map(|status| SignatureStatus {
                    slot: status.slot,
                    confirmations: status.confirmations,
                    err: status.err.map(Into::into),
                    confirmation_status: status.confirmation_status.as_ref().map(commitment_of),
                })
            })
            .collect())
    }

    async fn on_signature(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<SignatureSubscription, NetworkError> {
        let client = self.pubsub().await?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (notify_tx, notification) = oneshot::channel();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), NetworkError>>();

        let signature = *signature;
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let config = RpcSignatureSubscribeConfig {
                commitment: Some(CommitmentConfig::from(commitment)),
                enable_received_notification: Some(false),
            };
            let (mut notifications, unsubscribe) =
                match client.signature_subscribe(&signature, Some(config)).await {
                    Ok(subscription) => subscription,
                    Err(e) => {
                        let _ = ready_tx.send(Err(NetworkError::Subscription(e.to_string())));
                        return;
                    }
                };
            if ready_tx.send(Ok(())).is_err() {
                tracing::debug!("Signature listener {} abandoned during setup", id);
                unsubscribe().await;
                return;
            }

            tokio::select! {
                _ = task_cancel.cancelled() => {
                    tracing::debug!("Signature listener {} released", id);
                }
                response = notifications.next() => {
                    if let Some(response) = response {
                        if let RpcSignatureResult::ProcessedSignature(result) = response.value {
                            let _ = notify_tx.send(SignatureNotification {
                                slot: response.context.slot,
                                err: result.err.map(Into::into),
                            });
                        }
                    }
                }
            }
            unsubscribe().await;
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                self.listeners.lock().insert(id, cancel);
                Ok(SignatureSubscription { id, notification })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(NetworkError::Subscription(
                "subscription task ended before registering".to_string(),
            )),
        }
    }

    async fn remove_signature_listener(&self, id: SubscriptionId) -> Result<(), NetworkError> {
        if let Some(cancel) = self.listeners.lock().remove(&id) {
            cancel.cancel();
        }
        Ok(())
    }

    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, NetworkError> {
        let response = self
            .rpc
            .get_account_with_commitment(address, self.rpc.commitment())
            .await
            .map_err(rpc_error)?;
        Ok(response.value.map(|account| account.data))
    }

    async fn get_transaction_fee(
        &self,
        signature: &Signature,
    ) -> Result<Option<u64>, NetworkError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Json),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        let transaction: Option<EncodedConfirmedTransactionWithStatusMeta> = self
            .rpc
            .send(
                RpcRequest::GetTransaction,
                serde_json::json!([signature.to_string(), config]),
            )
            .await
            .map_err(rpc_error)?;

        Ok(transaction
            .and_then(|tx| tx.transaction.meta)
            .map(|meta| meta.fee))
    }
}
