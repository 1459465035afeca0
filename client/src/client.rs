use {
    crate::{
        config::HamtConfig,
        error::Result,
        gateway::Gateway,
        state::{Announcement, StateHeader},
        traversal::{self, Lookup},
    },
    solana_sdk::pubkey::Pubkey,
};

/// Client for one trie program deployment.
///
/// Reads go straight to the gateway; writes are built by the methods in
/// [`crate::mutation`].
pub struct HamtClient<G: Gateway> {
    pub(crate) gateway: G,
    pub(crate) config: HamtConfig,
}

impl<G: Gateway> HamtClient<G> {
    pub fn new(gateway: G, config: HamtConfig) -> Self {
        Self { gateway, config }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub async fn read_state(&self, state: &Pubkey) -> Result<StateHeader> {
        traversal::read_state(&self.gateway, state).await
    }

    pub async fn read_announcement(&self, address: &Pubkey) -> Result<Announcement> {
        traversal::read_announcement(&self.gateway, address).await
    }

    pub async fn lookup(&self, root: &Pubkey, key: &str) -> Result<Lookup> {
        traversal::lookup(&self.gateway, root, key).await
    }

    pub async fn get(&self, state: &Pubkey, key: &str) -> Result<Lookup> {
        traversal::get(&self.gateway, state, key).await
    }
}
