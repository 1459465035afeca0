use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};

/// Identity and program addresses used for every operation a client builds.
pub struct HamtConfig {
    /// Address of the deployed trie program. Owns every record the client
    /// allocates.
    pub program_id: Pubkey,
    /// Signs and pays for every operation.
    pub payer: Keypair,
}

impl HamtConfig {
    pub fn new(program_id: Pubkey, payer: Keypair) -> Self {
        Self { program_id, payer }
    }

    pub fn payer_pubkey(&self) -> Pubkey {
        self.payer.pubkey()
    }
}
