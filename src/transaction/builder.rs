//! Versioned message assembly
//!
//! Prepends compute-budget instructions, compiles a v0 message and resolves
//! any address lookup tables it references.

use super::SubmitError;
use crate::network::{Connection, NetworkError};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    address_lookup_table::state::AddressLookupTable,
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    instruction::Instruction,
    message::{v0, AddressLookupTableAccount, VersionedMessage},
    pubkey::Pubkey,
    transaction::VersionedTransaction,
};

/// Compute budget attached to a submission; zero fields add nothing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    pub compute_unit_limit: u32,
    pub priority_fee_micro_lamports: u64,
}

impl PriorityConfig {
    pub fn new(compute_unit_limit: u32, priority_fee_micro_lamports: u64) -> Self {
        Self {
            compute_unit_limit,
            priority_fee_micro_lamports,
        }
    }

    /// Compute-budget instructions, unit limit first
    pub fn instructions(&self) -> Vec<Instruction> {
        let mut instructions = Vec::with_capacity(2);
        if self.compute_unit_limit > 0 {
            instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(
                self.compute_unit_limit,
            ));
        }
        if self.priority_fee_micro_lamports > 0 {
            instructions.push(priority_fee_instruction(self.priority_fee_micro_lamports));
        }
        instructions
    }
}

/// Compute unit price instruction
pub fn priority_fee_instruction(micro_lamports: u64) -> Instruction {
    ComputeBudgetInstruction::set_compute_unit_price(micro_lamports)
}

/// Budget instructions followed by the caller's instructions
pub fn compose_instructions(
    priority: &PriorityConfig,
    instructions: Vec<Instruction>,
) -> Vec<Instruction> {
    let mut composed = priority.instructions();
    composed.extend(instructions);
    composed
}

/// Fetch and decode lookup tables, one request per table, concurrently
pub async fn resolve_lookup_tables(
    connection: &dyn Connection,
    keys: &[Pubkey],
) -> Result<Vec<AddressLookupTableAccount>, SubmitError> {
    let tables = try_join_all(keys.iter().map(|key| fetch_lookup_table(connection, *key))).await?;
    tracing::debug!("Resolved {} address lookup tables", tables.len());
    Ok(tables)
}

async fn fetch_lookup_table(
    connection: &dyn Connection,
    key: Pubkey,
) -> Result<AddressLookupTableAccount, SubmitError> {
    let data = connection
        .get_account_info(&key)
        .await?
        .ok_or(NetworkError::AccountNotFound(key))?;

    let table = AddressLookupTable::deserialize(&data)
        .map_err(|e| SubmitError::Build(format!("Failed to deserialize ALT {}: {}", key, e)))?;
    Ok(AddressLookupTableAccount {
        key,
        addresses: table.addresses.to_vec(),
    })
}

/// Compile an unsigned v0 transaction for `payer`
///
/// Lookup tables referenced by a first compile are resolved together with
/// `lookup_table_keys`, then the message is recompiled against all of them.
pub async fn build_versioned_transaction(
    connection: &dyn Connection,
    payer: &Pubkey,
    instructions: &[Instruction],
    lookup_table_keys: &[Pubkey],
    blockhash: Hash,
) -> Result<VersionedTransaction, SubmitError> {
    let draft = compile(payer, instructions, &[], blockhash)?;

    let mut keys: Vec<Pubkey> = lookup_table_keys.to_vec();
    for lookup in &draft.address_table_lookups {
        if !keys.contains(&lookup.account_key) {
            keys.push(lookup.account_key);
        }
    }

    let message = if keys.is_empty() {
        draft
    } else {
        let tables = resolve_lookup_tables(connection, &keys).await?;
        compile(payer, instructions, &tables, blockhash)?
    };

    let required = usize::from(message.header.num_required_signatures);
    Ok(VersionedTransaction {
        signatures: vec![Default::default(); required],
        message: VersionedMessage::V0(message),
    })
}

fn compile(
    payer: &Pubkey,
    instructions: &[Instruction],
    tables: &[AddressLookupTableAccount],
    blockhash: Hash,
) -> Result<v0::Message, SubmitError> {
    v0::Message::try_compile(payer, instructions, tables, blockhash)
        .map_err(|e| SubmitError::Build(format!("Failed to compile message: {}", e)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::network::memory::ScriptedConnection;
    use solana_sdk::{compute_budget, system_instruction};

    /// Raw account data of an active lookup table holding `addresses`
    pub(crate) fn lookup_table_bytes(addresses: &[Pubkey]) -> Vec<u8> {
        let mut data = vec![0u8; 56];
        data[0] = 1;
        data[4..12].copy_from_slice(&u64::MAX.to_le_bytes());
        for address in addresses {
            data.extend_from_slice(address.as_ref());
        }
        data
    }

    #[test]
    fn test_priority_instructions_order() {
        let instructions = PriorityConfig::new(400_000, 500).instructions();
        assert_eq!(instructions.len(), 2);
        assert!(instructions
            .iter()
            .all(|ix| ix.program_id == compute_budget::id()));
        assert_eq!(
            instructions[0],
            ComputeBudgetInstruction::set_compute_unit_limit(400_000)
        );
        assert_eq!(
            instructions[1],
            ComputeBudgetInstruction::set_compute_unit_price(500)
        );
    }

    #[test]
    fn test_zero_priority_adds_nothing() {
        assert!(PriorityConfig::default().instructions().is_empty());
        let only_price = PriorityConfig::new(0, 10).instructions();
        assert_eq!(only_price, vec![priority_fee_instruction(10)]);
    }

    #[test]
    fn test_compose_keeps_caller_order_after_budget() {
        let payer = Pubkey::new_unique();
        let a = system_instruction::transfer(&payer, &Pubkey::new_unique(), 1);
        let b = system_instruction::transfer(&payer, &Pubkey::new_unique(), 2);
        let composed =
            compose_instructions(&PriorityConfig::new(1, 0), vec![a.clone(), b.clone()]);
        assert_eq!(composed.len(), 3);
        assert_eq!(composed[1], a);
        assert_eq!(composed[2], b);
    }

    #[tokio::test]
    async fn test_build_without_tables_skips_fetches() {
        let connection = ScriptedConnection::new();
        let payer = Pubkey::new_unique();
        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 1);

        let tx = build_versioned_transaction(&connection, &payer, &[ix], &[], Hash::new_unique())
            .await
            .unwrap();

        assert_eq!(tx.signatures.len(), 1);
        assert_eq!(tx.message.static_account_keys()[0], payer);
        assert!(connection.account_fetches().is_empty());
    }

    #[tokio::test]
    async fn test_build_resolves_lookup_tables() {
        let connection = ScriptedConnection::new();
        let payer = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        let table_key = Pubkey::new_unique();
        connection.insert_account(table_key, lookup_table_bytes(&[recipient]));
        let ix = system_instruction::transfer(&payer, &recipient, 1);

        let tx = build_versioned_transaction(
            &connection,
            &payer,
            &[ix],
            &[table_key],
            Hash::new_unique(),
        )
        .await
        .unwrap();

        let lookups = tx.message.address_table_lookups().unwrap();
        assert_eq!(lookups.len(), 1);
        assert_eq!(lookups[0].account_key, table_key);
        assert!(!tx.message.static_account_keys().contains(&recipient));
        assert_eq!(connection.account_fetches(), vec![table_key]);
    }

    #[tokio::test]
    async fn test_missing_lookup_table_fails_build() {
        let connection = ScriptedConnection::new();
        let payer = Pubkey::new_unique();
        let missing = Pubkey::new_unique();
        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 1);

        let result = build_versioned_transaction(
            &connection,
            &payer,
            &[ix],
            &[missing],
            Hash::new_unique(),
        )
        .await;

        assert!(matches!(
            result,
            Err(SubmitError::Network(NetworkError::AccountNotFound(key))) if key == missing
        ));
    }
}
