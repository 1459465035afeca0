//! Read path: resolving keys against the on-ledger trie.
//!
//! A lookup starts at the root node and consumes one nibble of the key's
//! digest per level. At each level the selected slot either ends the walk
//! (empty, or holding the key) or, when it holds another key, hands the walk
//! to the node behind its collision link.

use {
    crate::{
        error::{HamtError, Result},
        gateway::Gateway,
        state::{
            decode_announcement, decode_node, decode_state, hash_key, slot_indices, Announcement,
            StateHeader,
        },
    },
    log::*,
    solana_sdk::pubkey::Pubkey,
};

/// Result of resolving a key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Lookup {
    /// The stored value, if the key is present.
    pub value: Option<u64>,
    /// Every node visited, root first.
    pub path: Vec<Pubkey>,
    /// Collision links followed.
    pub collisions: usize,
    /// Nodes a write of this key has to allocate. Non-zero only when the
    /// walk ended on a slot held by another key with no collision link.
    pub new_nodes_required: usize,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        self.value.is_some()
    }
}

pub async fn read_state<G: Gateway + ?Sized>(gateway: &G, state: &Pubkey) -> Result<StateHeader> {
    let header = decode_state(&gateway.read_record(state).await?)?;
    if !header.initialized {
        return Err(HamtError::Uninitialized(*state));
    }
    Ok(header)
}

pub async fn read_announcement<G: Gateway + ?Sized>(
    gateway: &G,
    address: &Pubkey,
) -> Result<Announcement> {
    decode_announcement(&gateway.read_record(address).await?)
}

/// Resolves `key` starting at the node stored at `root`.
pub async fn lookup<G: Gateway + ?Sized>(gateway: &G, root: &Pubkey, key: &str) -> Result<Lookup> {
    let digest = hash_key(key);
    let mut lookup = Lookup::default();
    let mut address = *root;

    for (depth, index) in slot_indices(&digest).enumerate() {
        let node = decode_node(&gateway.read_record(&address).await?)?;
        lookup.path.push(address);

        let slot = &node.slots[index];
        trace!("lookup {key:?}: depth {depth} node {address} slot {index}");

        if slot.is_empty() {
            return Ok(lookup);
        }
        if slot.key_hash == digest {
            lookup.value = Some(slot.value);
            return Ok(lookup);
        }
        if !slot.is_link() {
            lookup.new_nodes_required = 1;
            return Ok(lookup);
        }
        lookup.collisions += 1;
        address = slot.link;
    }

    // Every nibble of the digest was consumed by collision links.
    warn!("lookup {key:?}: digest exhausted after {} nodes", lookup.path.len());
    Ok(lookup)
}

/// Resolves `key` in the trie whose state record lives at `state`.
pub async fn get<G: Gateway + ?Sized>(gateway: &G, state: &Pubkey, key: &str) -> Result<Lookup> {
    let header = read_state(gateway, state).await?;
    lookup(gateway, &header.root, key).await
}
