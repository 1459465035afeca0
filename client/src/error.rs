use {
    solana_rpc_client_api::client_error::Error as ClientError,
    solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::TransactionError},
    thiserror::Error,
};

pub type Result<T> = std::result::Result<T, HamtError>;

#[derive(Debug, Error)]
pub enum HamtError {
    /// A record or instruction payload did not match its fixed layout.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("record {0} not found")]
    RecordNotFound(Pubkey),

    #[error("trie state {0} is not initialized")]
    Uninitialized(Pubkey),

    /// The ledger rejected the operation before execution.
    #[error("submission failed: {0}")]
    Submission(String),

    /// The operation landed but the trie program failed it.
    #[error("operation {signature} failed: {error}")]
    Execution {
        signature: Signature,
        error: TransactionError,
    },

    #[error("rpc error: {0}")]
    Rpc(#[from] ClientError),

    #[error("verification failed for key {key:?}: expected {expected}, found {actual:?}")]
    Verification {
        key: String,
        expected: u64,
        actual: Option<u64>,
    },

    #[error("key {key:?} still failing after {attempts} attempts")]
    RetriesExhausted { key: String, attempts: usize },
}

impl HamtError {
    /// Whether a fresh attempt of the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Submission(_) | Self::Execution { .. } | Self::Rpc(_)
        )
    }
}

impl From<std::io::Error> for HamtError {
    fn from(err: std::io::Error) -> Self {
        Self::MalformedRecord(err.to_string())
    }
}
