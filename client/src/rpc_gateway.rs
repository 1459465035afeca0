//! [`Gateway`] backed by a JSON RPC node.

use {
    crate::{
        error::{HamtError, Result},
        gateway::{Gateway, OperationStatus},
    },
    async_trait::async_trait,
    log::*,
    solana_rpc_client::nonblocking::rpc_client::RpcClient,
    solana_rpc_client_api::config::RpcTransactionConfig,
    solana_sdk::{
        commitment_config::CommitmentConfig,
        instruction::Instruction,
        pubkey::Pubkey,
        signature::{Keypair, Signature},
        signer::Signer,
        transaction::Transaction,
    },
    solana_transaction_status::UiTransactionEncoding,
};

pub struct RpcGateway {
    client: RpcClient,
}

impl RpcGateway {
    pub fn new(json_rpc_url: String, commitment: CommitmentConfig) -> Self {
        Self {
            client: RpcClient::new_with_commitment(json_rpc_url, commitment),
        }
    }

    // Transaction lookups are not served below `confirmed`.
    fn finality_commitment(&self) -> CommitmentConfig {
        let commitment = self.client.commitment();
        if commitment.is_at_least_confirmed() {
            commitment
        } else {
            CommitmentConfig::confirmed()
        }
    }
}

#[async_trait]
impl Gateway for RpcGateway {
    async fn read_record(&self, address: &Pubkey) -> Result<Vec<u8>> {
        self.client
            .get_account_with_commitment(address, self.client.commitment())
            .await?
            .value
            .map(|account| account.data)
            .ok_or(HamtError::RecordNotFound(*address))
    }

    async fn minimum_balance_for_size(&self, size: usize) -> Result<u64> {
        Ok(self
            .client
            .get_minimum_balance_for_rent_exemption(size)
            .await?)
    }

    async fn submit(
        &self,
        instructions: Vec<Instruction>,
        signers: &[&Keypair],
    ) -> Result<Signature> {
        let payer = signers
            .first()
            .ok_or_else(|| HamtError::Submission("operation has no fee payer".to_string()))?;
        let blockhash = self.client.get_latest_blockhash().await?;

        let mut transaction = Transaction::new_with_payer(&instructions, Some(&payer.pubkey()));
        transaction
            .try_sign(signers, blockhash)
            .map_err(|err| HamtError::Submission(err.to_string()))?;

        let signature = self
            .client
            .send_transaction(&transaction)
            .await
            .map_err(|err| HamtError::Submission(err.to_string()))?;
        debug!(
            "submitted {} with {} instructions",
            signature,
            instructions.len()
        );
        Ok(signature)
    }

    async fn await_finality(&self, signature: &Signature) -> Result<OperationStatus> {
        let commitment = self.finality_commitment();
        self.client
            .poll_for_signature_with_commitment(signature, commitment)
            .await
            .map_err(|err| HamtError::Submission(err.to_string()))?;

        let transaction = self
            .client
            .get_transaction_with_config(
                signature,
                RpcTransactionConfig {
                    encoding: Some(UiTransactionEncoding::Base64),
                    commitment: Some(commitment),
                    max_supported_transaction_version: Some(0),
                },
            )
            .await?;
        let meta = transaction.transaction.meta.ok_or_else(|| {
            HamtError::Submission(format!("operation {signature} has no status meta"))
        })?;

        Ok(OperationStatus {
            fee: meta.fee,
            compute_units: Option::<u64>::from(meta.compute_units_consumed).unwrap_or_default(),
            error: meta.err,
        })
    }
}
