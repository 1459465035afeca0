//! Write path: building and submitting atomic trie operations.
//!
//! Every write is one transaction. Records a write needs (collision nodes,
//! announcement records, a fresh trie's state and root) are allocated by
//! system `CreateAccount` steps placed ahead of the program instruction that
//! fills them, so allocation and linking land together or not at all.

use {
    crate::{
        client::HamtClient,
        error::{HamtError, Result},
        gateway::Gateway,
        instruction::{encode_announce_instruction, encode_init_instruction, encode_set_instruction},
        state::{announcement_record_size, NODE_SIZE, STATE_SIZE},
    },
    log::*,
    solana_measure::measure::Measure,
    solana_sdk::{
        hash::Hash,
        instruction::{AccountMeta, Instruction},
        pubkey::Pubkey,
        signature::Keypair,
        signer::Signer,
        system_instruction, sysvar,
    },
};

/// Cost and timing of one applied operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationOutcome {
    pub elapsed_ms: u64,
    /// Transaction fee, in lamports.
    pub fee: u64,
    /// Lamports deposited to keep newly allocated records rent exempt.
    pub rent: u64,
    pub compute_units: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetOutcome {
    /// Writable records referenced by the operation.
    pub records_written: Vec<Pubkey>,
    /// Collision nodes allocated by the operation.
    pub new_records: Vec<Pubkey>,
    pub outcome: OperationOutcome,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitOutcome {
    pub state: Pubkey,
    pub root: Pubkey,
    pub outcome: OperationOutcome,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnounceOutcome {
    pub announcement: Pubkey,
    pub outcome: OperationOutcome,
}

impl<G: Gateway> HamtClient<G> {
    /// Builds the step allocating a rent exempt record of `size` bytes owned
    /// by the trie program, returning it with the lamports it deposits.
    async fn allocate(&self, record: &Pubkey, size: usize) -> Result<(Instruction, u64)> {
        let lamports = self.gateway.minimum_balance_for_size(size).await?;
        let instruction = system_instruction::create_account(
            &self.config.payer_pubkey(),
            record,
            lamports,
            size as u64,
            &self.config.program_id,
        );
        Ok((instruction, lamports))
    }

    /// Submits `instructions` as one operation and waits for it to be final.
    async fn execute(
        &self,
        mut measure: Measure,
        instructions: Vec<Instruction>,
        signers: &[&Keypair],
        rent: u64,
    ) -> Result<OperationOutcome> {
        let signature = self.gateway.submit(instructions, signers).await?;
        let status = self.gateway.await_finality(&signature).await?;
        measure.stop();

        if let Some(error) = status.error {
            return Err(HamtError::Execution { signature, error });
        }
        Ok(OperationOutcome {
            elapsed_ms: measure.as_ms(),
            fee: status.fee,
            rent,
            compute_units: status.compute_units,
        })
    }

    /// Creates a new trie: its state record and an empty root node.
    pub async fn init(&self) -> Result<InitOutcome> {
        let measure = Measure::start("hamt-init");
        let state = Keypair::new();
        let root = Keypair::new();

        let (create_state, state_rent) = self.allocate(&state.pubkey(), STATE_SIZE).await?;
        let (create_root, root_rent) = self.allocate(&root.pubkey(), NODE_SIZE).await?;
        let init = Instruction::new_with_bytes(
            self.config.program_id,
            &encode_init_instruction()?,
            vec![
                AccountMeta::new_readonly(self.config.payer_pubkey(), true),
                AccountMeta::new(state.pubkey(), false),
                AccountMeta::new(root.pubkey(), false),
                AccountMeta::new_readonly(sysvar::rent::id(), false),
            ],
        );

        let outcome = self
            .execute(
                measure,
                vec![create_state, create_root, init],
                &[&self.config.payer, &state, &root],
                state_rent.saturating_add(root_rent),
            )
            .await?;
        info!("initialized trie state {} root {}", state.pubkey(), root.pubkey());

        Ok(InitOutcome {
            state: state.pubkey(),
            root: root.pubkey(),
            outcome,
        })
    }

    /// Writes a new announcement record for `url` and the content `hash`.
    pub async fn announce(&self, state: &Pubkey, url: &str, hash: &Hash) -> Result<AnnounceOutcome> {
        let measure = Measure::start("hamt-announce");
        let announcement = Keypair::new();

        let (create_announcement, rent) = self
            .allocate(&announcement.pubkey(), announcement_record_size(url))
            .await?;
        let announce = Instruction::new_with_bytes(
            self.config.program_id,
            &encode_announce_instruction(url, hash)?,
            vec![
                AccountMeta::new_readonly(self.config.payer_pubkey(), true),
                AccountMeta::new(*state, false),
                AccountMeta::new_readonly(sysvar::rent::id(), false),
                AccountMeta::new(announcement.pubkey(), false),
            ],
        );

        let outcome = self
            .execute(
                measure,
                vec![create_announcement, announce],
                &[&self.config.payer, &announcement],
                rent,
            )
            .await?;
        debug!("announced {url} at {}", announcement.pubkey());

        Ok(AnnounceOutcome {
            announcement: announcement.pubkey(),
            outcome,
        })
    }

    /// Sets `key` to `value` in the trie whose state record lives at `state`.
    ///
    /// The key is resolved first; the set step then references the resolved
    /// path read-only except for its last node, and any collision node the
    /// write needs is allocated in the same operation. Failures are returned
    /// as is, retrying is left to the caller.
    pub async fn set(&self, state: &Pubkey, key: &str, value: u64) -> Result<SetOutcome> {
        let measure = Measure::start("hamt-set");
        let lookup = self.get(state, key).await?;
        let Some((last, ancestors)) = lookup.path.split_last() else {
            return Err(HamtError::MalformedRecord(format!(
                "empty lookup path for {key:?}"
            )));
        };

        let new_nodes = (0..lookup.new_nodes_required)
            .map(|_| Keypair::new())
            .collect::<Vec<_>>();
        let mut instructions = Vec::with_capacity(new_nodes.len() + 1);
        let mut rent = 0u64;
        for node in &new_nodes {
            let (create_node, lamports) = self.allocate(&node.pubkey(), NODE_SIZE).await?;
            instructions.push(create_node);
            rent = rent.saturating_add(lamports);
        }

        let mut accounts = Vec::with_capacity(lookup.path.len() + new_nodes.len() + 2);
        accounts.push(AccountMeta::new_readonly(self.config.payer_pubkey(), true));
        accounts.push(AccountMeta::new_readonly(*state, false));
        accounts.extend(
            ancestors
                .iter()
                .map(|address| AccountMeta::new_readonly(*address, false)),
        );
        accounts.push(AccountMeta::new(*last, false));
        accounts.extend(
            new_nodes
                .iter()
                .map(|node| AccountMeta::new(node.pubkey(), false)),
        );
        instructions.push(Instruction::new_with_bytes(
            self.config.program_id,
            &encode_set_instruction(key, value)?,
            accounts,
        ));

        let mut signers = Vec::with_capacity(new_nodes.len() + 1);
        signers.push(&self.config.payer);
        signers.extend(new_nodes.iter());

        debug!(
            "set {key:?} = {value}: path of {} nodes, {} collisions, {} new nodes",
            lookup.path.len(),
            lookup.collisions,
            new_nodes.len()
        );
        let outcome = self.execute(measure, instructions, &signers, rent).await?;

        let new_records = new_nodes.iter().map(|node| node.pubkey()).collect::<Vec<_>>();
        let mut records_written = Vec::with_capacity(new_records.len() + 1);
        records_written.push(*last);
        records_written.extend(new_records.iter().copied());

        Ok(SetOutcome {
            records_written,
            new_records,
            outcome,
        })
    }
}
