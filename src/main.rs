//! Sonic submission client demonstration
//!
//! Sends a small self-transfer through the retrying submission pipeline,
//! then a short batch through the signing queue.
//!
//! Usage: `sonic-submit [config.toml]`

use anyhow::Context;
use solana_sdk::{
    message::{v0, VersionedMessage},
    system_instruction,
    transaction::VersionedTransaction,
};
use sonic_submit::{
    queue::BatchSummary, ClientConfig, Commitment, Connection, KeypairWallet, SonicClient,
    SubmitRequest, WalletAdapter,
};
use std::path::PathBuf;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    info!("🚀 Starting Sonic submission demonstration...");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ClientConfig::load(config_path.as_deref()).context("loading configuration")?;
    let keypair_path = config.keypair_path();

    let client = SonicClient::new(config).context("creating client")?;
    let wallet = KeypairWallet::from_file(&keypair_path)
        .with_context(|| format!("reading keypair from {}", keypair_path.display()))?;
    let owner = wallet.connect().await.context("connecting wallet")?;
    info!(
        "✅ Wallet {} ready",
        sonic_submit::util::common::truncate_middle(&owner.to_string(), 12)
    );

    // Example 1: single transfer with rebroadcasting
    info!("\n💸 Example 1: Self-transfer with rebroadcast");
    let request = SubmitRequest::new(vec![system_instruction::transfer(&owner, &owner, 1)]);
    match client.send_transaction(&wallet, request).await {
        Ok(receipt) => {
            info!("✅ {}", receipt);
            info!("🔗 {}", client.explorer_url(&receipt.signature));

            match client
                .confirm_transaction(&receipt.signature, Commitment::Finalized)
                .await
            {
                Ok(status) => info!("🏁 Finalized in slot {}", status.slot),
                Err(e) => error!("❌ Finalization wait failed: {}", e),
            }
            match client.get_transaction_fee(&receipt.signature).await {
                Ok(fee) => info!("💰 Fee paid: {} lamports", fee),
                Err(e) => error!("❌ Fee lookup failed: {}", e),
            }
        }
        Err(e) => error!("❌ Submission failed ({:?}): {}", e.kind(), e),
    }

    // Example 2: batch of transfers through the signing queue
    info!("\n📦 Example 2: Batch of three transfers");
    let latest = client
        .connection()
        .get_latest_blockhash(Commitment::Processed)
        .await
        .context("fetching blockhash")?;
    let batch = (1..=3u64)
        .map(|lamports| {
            let ix = system_instruction::transfer(&owner, &owner, lamports);
            let message = v0::Message::try_compile(&owner, &[ix], &[], latest.blockhash)?;
            Ok(VersionedTransaction {
                signatures: vec![Default::default(); 1],
                message: VersionedMessage::V0(message),
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    match client.send_batch(&wallet, batch).await {
        Ok(settlements) => {
            for (index, settlement) in settlements.iter().enumerate() {
                match settlement.clone().into_result() {
                    Ok(confirmed) => {
                        info!("   #{} ✅ {} (slot {})", index, confirmed.signature, confirmed.slot)
                    }
                    Err(e) => error!("   #{} ❌ {}", index, e),
                }
            }
            let summary = BatchSummary::from_settlements(&settlements);
            info!("📊 Batch summary: {:?}", summary);
        }
        Err(e) => error!("❌ Batch failed: {}", e),
    }

    wallet.disconnect().await.context("disconnecting wallet")?;
    info!("🎉 Demonstration complete");
    Ok(())
}
