//! Client for a hash array mapped trie stored in ledger accounts.
//!
//! The trie lives on the ledger as one account per node. Each node holds 16
//! slots, and a key is placed by consuming its SHA-256 digest one nibble per
//! level. Keys that land on an occupied slot are chained through a collision
//! link to a deeper node. The trie program applies every mutation; this crate
//! encodes its records and instructions, walks the trie to resolve keys, and
//! assembles the atomic operations that write to it.
//!
//! * [`state`] and [`instruction`] hold the fixed binary layouts.
//! * [`gateway`] abstracts the ledger; [`rpc_gateway`] talks to a JSON RPC
//!   node.
//! * [`traversal`] is the read path and [`mutation`] the write path, both
//!   exposed through [`HamtClient`].

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod instruction;
#[cfg(feature = "dev-context-only-utils")]
pub mod mock_gateway;
pub mod mutation;
pub mod rpc_gateway;
pub mod state;
pub mod traversal;

pub use {
    client::HamtClient,
    config::HamtConfig,
    error::{HamtError, Result},
    gateway::{Gateway, OperationStatus},
    mutation::{AnnounceOutcome, InitOutcome, OperationOutcome, SetOutcome},
    traversal::Lookup,
};
