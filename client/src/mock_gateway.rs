//! In-memory ledger implementing [`Gateway`], for tests.
//!
//! Submitted operations are applied atomically against a copy of the record
//! map: system `CreateAccount` steps allocate zeroed records, and the trie
//! program's instructions are executed the way the deployed program handles
//! them, including account writability and rent checks. Rejections and
//! execution failures can be injected to exercise retry paths.

use {
    crate::{
        error::{HamtError, Result},
        gateway::{Gateway, OperationStatus},
        instruction::{decode_instruction, HamtInstruction},
        state::{
            decode_node, decode_state, encode_announcement, encode_node, encode_state, hash_key,
            slot_index, Announcement, Node, Slot, StateHeader, MAX_DEPTH, NODE_SIZE, STATE_SIZE,
        },
    },
    async_trait::async_trait,
    solana_sdk::{
        instruction::{Instruction, InstructionError},
        pubkey::Pubkey,
        rent::Rent,
        signature::{Keypair, Signature},
        signer::Signer,
        system_instruction::SystemInstruction,
        system_program,
        transaction::TransactionError,
    },
    std::{
        collections::HashMap,
        sync::{RwLock, RwLockWriteGuard},
    },
};

pub const LAMPORTS_PER_SIGNATURE: u64 = 5000;

const INVALID_INSTRUCTION: u32 = 0;
const NOT_RENT_EXEMPT: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockRecord {
    pub lamports: u64,
    pub data: Vec<u8>,
    pub owner: Pubkey,
}

#[derive(Default)]
struct MockLedger {
    records: HashMap<Pubkey, MockRecord>,
    statuses: HashMap<Signature, OperationStatus>,
    submissions: u64,
    reject_next: usize,
    reject_every: Option<u64>,
    fail_next: usize,
    interleave: bool,
}

pub struct MockGateway {
    program_id: Pubkey,
    rent: Rent,
    ledger: RwLock<MockLedger>,
}

impl MockGateway {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            rent: Rent::default(),
            ledger: RwLock::default(),
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    fn ledger(&self) -> RwLockWriteGuard<MockLedger> {
        self.ledger.write().unwrap()
    }

    /// Stores a rent exempt record owned by the trie program.
    pub fn insert_record(&self, address: Pubkey, data: Vec<u8>) {
        let record = MockRecord {
            lamports: self.rent.minimum_balance(data.len()),
            data,
            owner: self.program_id,
        };
        self.ledger().records.insert(address, record);
    }

    pub fn record(&self, address: &Pubkey) -> Option<MockRecord> {
        self.ledger().records.get(address).cloned()
    }

    pub fn record_count(&self) -> usize {
        self.ledger().records.len()
    }

    /// Total submissions seen, rejected ones included.
    pub fn submissions(&self) -> u64 {
        self.ledger().submissions
    }

    /// Rejects the next `count` submissions before they execute.
    pub fn reject_next_submissions(&self, count: usize) {
        self.ledger().reject_next = count;
    }

    /// Rejects every `nth` submission, counting from the first. Zero turns
    /// the rejection off.
    pub fn reject_every_nth_submission(&self, nth: u64) {
        self.ledger().reject_every = (nth > 0).then_some(nth);
    }

    /// Lands the next `count` submissions as failed executions.
    pub fn fail_next_executions(&self, count: usize) {
        self.ledger().fail_next = count;
    }

    /// Yields to the runtime before every read and submission, so
    /// concurrent operations interleave their lookups and writes.
    pub fn interleave_operations(&self, interleave: bool) {
        self.ledger().interleave = interleave;
    }

    async fn maybe_yield(&self) {
        let interleave = self.ledger().interleave;
        if interleave {
            tokio::task::yield_now().await;
        }
    }

    fn is_writable(instruction: &Instruction, address: &Pubkey) -> bool {
        instruction
            .accounts
            .iter()
            .any(|meta| meta.pubkey == *address && meta.is_writable)
    }

    fn is_referenced(instruction: &Instruction, address: &Pubkey) -> bool {
        instruction
            .accounts
            .iter()
            .any(|meta| meta.pubkey == *address)
    }

    fn account_at(
        instruction: &Instruction,
        index: usize,
    ) -> std::result::Result<Pubkey, InstructionError> {
        instruction
            .accounts
            .get(index)
            .map(|meta| meta.pubkey)
            .ok_or(InstructionError::NotEnoughAccountKeys)
    }

    /// Fetches a program owned record the instruction is allowed to write.
    fn writable_record<'a>(
        &self,
        records: &'a mut HashMap<Pubkey, MockRecord>,
        instruction: &Instruction,
        address: &Pubkey,
    ) -> std::result::Result<&'a mut MockRecord, InstructionError> {
        if !Self::is_writable(instruction, address) {
            return Err(InstructionError::ReadonlyDataModified);
        }
        let record = records
            .get_mut(address)
            .ok_or(InstructionError::UninitializedAccount)?;
        if record.owner != self.program_id {
            return Err(InstructionError::IncorrectProgramId);
        }
        if !self.rent.is_exempt(record.lamports, record.data.len()) {
            return Err(InstructionError::Custom(NOT_RENT_EXEMPT));
        }
        Ok(record)
    }

    fn read_node(
        records: &HashMap<Pubkey, MockRecord>,
        address: &Pubkey,
    ) -> std::result::Result<Node, InstructionError> {
        let record = records
            .get(address)
            .ok_or(InstructionError::UninitializedAccount)?;
        decode_node(&record.data).map_err(|_| InstructionError::InvalidAccountData)
    }

    fn read_header(
        records: &HashMap<Pubkey, MockRecord>,
        address: &Pubkey,
    ) -> std::result::Result<StateHeader, InstructionError> {
        let record = records
            .get(address)
            .ok_or(InstructionError::UninitializedAccount)?;
        let header =
            decode_state(&record.data).map_err(|_| InstructionError::InvalidAccountData)?;
        if !header.initialized {
            return Err(InstructionError::UninitializedAccount);
        }
        Ok(header)
    }

    fn create_account(
        &self,
        records: &mut HashMap<Pubkey, MockRecord>,
        instruction: &Instruction,
    ) -> std::result::Result<u64, InstructionError> {
        let system_instruction: SystemInstruction = bincode::deserialize(&instruction.data)
            .map_err(|_| InstructionError::InvalidInstructionData)?;
        let SystemInstruction::CreateAccount {
            lamports,
            space,
            owner,
        } = system_instruction
        else {
            return Err(InstructionError::InvalidInstructionData);
        };
        let address = Self::account_at(instruction, 1)?;
        if records
            .get(&address)
            .is_some_and(|record| record.lamports > 0)
        {
            return Err(InstructionError::AccountAlreadyInitialized);
        }
        records.insert(
            address,
            MockRecord {
                lamports,
                data: vec![0; space as usize],
                owner,
            },
        );
        Ok(150)
    }

    fn process_init(
        &self,
        records: &mut HashMap<Pubkey, MockRecord>,
        instruction: &Instruction,
    ) -> std::result::Result<u64, InstructionError> {
        let state = Self::account_at(instruction, 1)?;
        let root = Self::account_at(instruction, 2)?;

        let root_record = self.writable_record(records, instruction, &root)?;
        if root_record.data.len() != NODE_SIZE {
            return Err(InstructionError::InvalidAccountData);
        }

        let state_record = self.writable_record(records, instruction, &state)?;
        if state_record.data.len() != STATE_SIZE {
            return Err(InstructionError::InvalidAccountData);
        }
        let header =
            decode_state(&state_record.data).map_err(|_| InstructionError::InvalidAccountData)?;
        if header.initialized {
            return Err(InstructionError::AccountAlreadyInitialized);
        }
        state_record.data = encode_state(&StateHeader {
            initialized: true,
            root,
            announcement_count: 0,
        })
        .map_err(|_| InstructionError::InvalidAccountData)?;
        Ok(1_000)
    }

    fn process_announce(
        &self,
        records: &mut HashMap<Pubkey, MockRecord>,
        instruction: &Instruction,
        url: String,
        hash: solana_sdk::hash::Hash,
    ) -> std::result::Result<u64, InstructionError> {
        let state = Self::account_at(instruction, 1)?;
        let announcement = Self::account_at(instruction, 3)?;

        let mut header = Self::read_header(records, &state)?;
        let data = encode_announcement(&Announcement {
            url,
            hash,
            next: Pubkey::default(),
        })
        .map_err(|_| InstructionError::InvalidInstructionData)?;

        let record = self.writable_record(records, instruction, &announcement)?;
        if record.data.len() < data.len() {
            return Err(InstructionError::AccountDataTooSmall);
        }
        record.data[..data.len()].copy_from_slice(&data);

        header.announcement_count = header.announcement_count.saturating_add(1);
        let state_record = self.writable_record(records, instruction, &state)?;
        state_record.data =
            encode_state(&header).map_err(|_| InstructionError::InvalidAccountData)?;
        Ok(2_000)
    }

    fn process_set(
        &self,
        records: &mut HashMap<Pubkey, MockRecord>,
        instruction: &Instruction,
        key: String,
        value: u64,
    ) -> std::result::Result<u64, InstructionError> {
        let state = Self::account_at(instruction, 1)?;
        let header = Self::read_header(records, &state)?;
        let digest = hash_key(&key);

        // Zeroed program nodes passed in for collision links, in order.
        let mut spare_nodes = instruction.accounts[2..]
            .iter()
            .filter(|meta| meta.is_writable && meta.pubkey != header.root)
            .filter(|meta| {
                records.get(&meta.pubkey).is_some_and(|record| {
                    record.owner == self.program_id
                        && record.data.len() == NODE_SIZE
                        && record.data.iter().all(|byte| *byte == 0)
                })
            })
            .map(|meta| meta.pubkey)
            .collect::<Vec<_>>()
            .into_iter();

        let mut address = header.root;
        for depth in 0..MAX_DEPTH {
            if !Self::is_referenced(instruction, &address) {
                return Err(InstructionError::NotEnoughAccountKeys);
            }
            let mut node = Self::read_node(records, &address)?;
            let index = slot_index(&digest, depth).ok_or(InstructionError::InvalidArgument)?;
            let slot = node.slots[index];
            let compute_units = 1_000 + 500 * depth as u64;

            if slot.is_empty() || slot.key_hash == digest {
                node.slots[index] = Slot {
                    value,
                    key_hash: digest,
                    link: slot.link,
                };
                let record = self.writable_record(records, instruction, &address)?;
                record.data = encode_node(&node).map_err(|_| InstructionError::InvalidAccountData)?;
                return Ok(compute_units);
            }
            if slot.is_link() {
                address = slot.link;
                continue;
            }

            let child_address = spare_nodes
                .next()
                .ok_or(InstructionError::NotEnoughAccountKeys)?;
            let child_index =
                slot_index(&digest, depth + 1).ok_or(InstructionError::InvalidArgument)?;
            let mut child = Node::default();
            child.slots[child_index] = Slot {
                value,
                key_hash: digest,
                link: Pubkey::default(),
            };
            node.slots[index].link = child_address;

            let record = self.writable_record(records, instruction, &address)?;
            record.data = encode_node(&node).map_err(|_| InstructionError::InvalidAccountData)?;
            let child_record = self.writable_record(records, instruction, &child_address)?;
            child_record.data =
                encode_node(&child).map_err(|_| InstructionError::InvalidAccountData)?;
            return Ok(compute_units + 500);
        }
        Err(InstructionError::InvalidArgument)
    }

    fn process_instruction(
        &self,
        records: &mut HashMap<Pubkey, MockRecord>,
        instruction: &Instruction,
    ) -> std::result::Result<u64, InstructionError> {
        if instruction.program_id == system_program::id() {
            return self.create_account(records, instruction);
        }
        if instruction.program_id != self.program_id {
            return Err(InstructionError::IncorrectProgramId);
        }
        match decode_instruction(&instruction.data)
            .map_err(|_| InstructionError::Custom(INVALID_INSTRUCTION))?
        {
            HamtInstruction::Init => self.process_init(records, instruction),
            HamtInstruction::Announce { url, hash } => {
                self.process_announce(records, instruction, url, hash)
            }
            HamtInstruction::SetValue { key, value } => {
                self.process_set(records, instruction, key, value)
            }
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn read_record(&self, address: &Pubkey) -> Result<Vec<u8>> {
        self.maybe_yield().await;
        self.ledger()
            .records
            .get(address)
            .filter(|record| record.lamports > 0)
            .map(|record| record.data.clone())
            .ok_or(HamtError::RecordNotFound(*address))
    }

    async fn minimum_balance_for_size(&self, size: usize) -> Result<u64> {
        Ok(self.rent.minimum_balance(size))
    }

    async fn submit(
        &self,
        instructions: Vec<Instruction>,
        signers: &[&Keypair],
    ) -> Result<Signature> {
        self.maybe_yield().await;
        let mut ledger = self.ledger();
        ledger.submissions += 1;

        if ledger.reject_next > 0 {
            ledger.reject_next -= 1;
            return Err(HamtError::Submission("injected rejection".to_string()));
        }
        if let Some(nth) = ledger.reject_every {
            if ledger.submissions.checked_rem(nth) == Some(0) {
                return Err(HamtError::Submission("injected rejection".to_string()));
            }
        }

        let signed = signers
            .iter()
            .map(|signer| signer.pubkey())
            .collect::<Vec<_>>();
        if let Some(meta) = instructions
            .iter()
            .flat_map(|instruction| instruction.accounts.iter())
            .find(|meta| meta.is_signer && !signed.contains(&meta.pubkey))
        {
            return Err(HamtError::Submission(format!(
                "missing signature for {}",
                meta.pubkey
            )));
        }

        let mut signature_bytes = [0u8; 64];
        signature_bytes[..8].copy_from_slice(&ledger.submissions.to_le_bytes());
        let signature = Signature::from(signature_bytes);
        let fee = LAMPORTS_PER_SIGNATURE.saturating_mul(signers.len() as u64);

        let status = if ledger.fail_next > 0 {
            ledger.fail_next -= 1;
            OperationStatus {
                fee,
                compute_units: 0,
                error: Some(TransactionError::InstructionError(
                    0,
                    InstructionError::Custom(INVALID_INSTRUCTION),
                )),
            }
        } else {
            let mut records = ledger.records.clone();
            let mut compute_units = 0u64;
            let mut error = None;
            for (index, instruction) in instructions.iter().enumerate() {
                match self.process_instruction(&mut records, instruction) {
                    Ok(units) => compute_units += units,
                    Err(err) => {
                        error = Some(TransactionError::InstructionError(index as u8, err));
                        break;
                    }
                }
            }
            if error.is_none() {
                ledger.records = records;
            }
            OperationStatus {
                fee,
                compute_units,
                error,
            }
        };

        ledger.statuses.insert(signature, status);
        Ok(signature)
    }

    async fn await_finality(&self, signature: &Signature) -> Result<OperationStatus> {
        self.ledger()
            .statuses
            .get(signature)
            .cloned()
            .ok_or_else(|| HamtError::Submission(format!("unknown operation {signature}")))
    }
}
