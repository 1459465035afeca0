//! Access to the ledger that stores trie records.
//!
//! Consumers plug a ledger into the client by implementing [`Gateway`]. The
//! client only ever reads raw record bytes, asks for rent-exempt balances,
//! and submits whole operations; everything else happens on the ledger.

use {
    crate::error::Result,
    async_trait::async_trait,
    solana_sdk::{
        instruction::Instruction, pubkey::Pubkey, signature::Keypair, signature::Signature,
        transaction::TransactionError,
    },
};

/// Final status of a submitted operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationStatus {
    pub fee: u64,
    pub compute_units: u64,
    /// Set when the operation landed but failed to execute.
    pub error: Option<TransactionError>,
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetch the data of the record at `address`, or
    /// `HamtError::RecordNotFound`.
    async fn read_record(&self, address: &Pubkey) -> Result<Vec<u8>>;

    /// Balance required to keep a record of `size` bytes alive indefinitely.
    async fn minimum_balance_for_size(&self, size: usize) -> Result<u64>;

    /// Submit `instructions` as a single atomic operation. The first signer
    /// pays for it.
    async fn submit(&self, instructions: Vec<Instruction>, signers: &[&Keypair])
        -> Result<Signature>;

    /// Wait until the operation identified by `signature` is final.
    async fn await_finality(&self, signature: &Signature) -> Result<OperationStatus>;
}
