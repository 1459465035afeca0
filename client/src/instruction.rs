//! Instructions understood by the trie program.
//!
//! The payload is the borsh encoding of [`HamtInstruction`]: a one byte tag
//! followed by the variant's fields in declaration order. Strings carry a
//! little-endian `u32` length prefix; hashes are written as raw 32 bytes.

use {
    crate::error::{HamtError, Result},
    borsh::{BorshDeserialize, BorshSerialize},
    solana_sdk::hash::Hash,
};

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum HamtInstruction {
    /// Initializes a trie state account and its root node.
    ///
    /// Accounts expected:
    ///
    /// 0. `[signer]` The payer
    /// 1. `[writable]` Trie state account, 41 bytes
    /// 2. `[writable]` Root node account, 1152 bytes
    /// 3. `[]` The rent sysvar
    Init,

    /// Writes an announcement record.
    ///
    /// Accounts expected:
    ///
    /// 0. `[signer]` The payer
    /// 1. `[writable]` Trie state account
    /// 2. `[]` The rent sysvar
    /// 3. `[writable]` Empty, rent exempt announcement account
    Announce { url: String, hash: Hash },

    /// Sets the value stored under `key`.
    ///
    /// Accounts expected:
    ///
    /// 0. `[signer]` The payer
    /// 1. `[]` Trie state account
    /// 2.. `[]` Every node on the key's path but the last
    /// N. `[writable]` The last node on the key's path
    /// N+1.. `[writable]` Empty, rent exempt nodes for new collision links
    SetValue { key: String, value: u64 },
}

pub fn encode_instruction(instruction: &HamtInstruction) -> Result<Vec<u8>> {
    Ok(borsh::to_vec(instruction)?)
}

pub fn encode_init_instruction() -> Result<Vec<u8>> {
    encode_instruction(&HamtInstruction::Init)
}

pub fn encode_set_instruction(key: &str, value: u64) -> Result<Vec<u8>> {
    encode_instruction(&HamtInstruction::SetValue {
        key: key.to_string(),
        value,
    })
}

/// Encodes an announcement under its own tag, `1`. The set-value tag `2` is
/// reserved for key writes even though both payloads start with a string.
pub fn encode_announce_instruction(url: &str, hash: &Hash) -> Result<Vec<u8>> {
    encode_instruction(&HamtInstruction::Announce {
        url: url.to_string(),
        hash: *hash,
    })
}

/// Decodes an instruction payload, rejecting unknown tags, lengths that run
/// past the end of `data` and trailing bytes.
pub fn decode_instruction(data: &[u8]) -> Result<HamtInstruction> {
    HamtInstruction::try_from_slice(data)
        .map_err(|err| HamtError::MalformedRecord(format!("invalid instruction: {err}")))
}

#[cfg(test)]
mod tests {
    use {
        super::*, assert_matches::assert_matches, solana_sdk::hash::hashv, test_case::test_case,
    };

    #[test]
    fn test_set_instruction_layout() {
        let data = encode_set_instruction("test7", 7).unwrap();
        assert_eq!(data.len(), 1 + 4 + 5 + 8);
        assert_eq!(data[0], 2);
        assert_eq!(&data[1..5], &5u32.to_le_bytes());
        assert_eq!(&data[5..10], b"test7");
        assert_eq!(&data[10..], &7u64.to_le_bytes());
        assert_eq!(
            decode_instruction(&data).unwrap(),
            HamtInstruction::SetValue {
                key: "test7".to_string(),
                value: 7
            }
        );
    }

    #[test]
    fn test_announce_instruction_layout() {
        let url = "https://example.com/";
        let hash = hashv(&[b"announcement"]);
        let data = encode_announce_instruction(url, &hash).unwrap();
        assert_eq!(data.len(), 57);
        assert_eq!(data[0], 1);
        assert_eq!(&data[1..5], &20u32.to_le_bytes());
        assert_eq!(&data[5..25], url.as_bytes());
        assert_eq!(&data[25..], hash.as_ref());
        assert_eq!(
            decode_instruction(&data).unwrap(),
            HamtInstruction::Announce {
                url: url.to_string(),
                hash,
            }
        );
    }

    #[test]
    fn test_init_instruction_layout() {
        assert_eq!(encode_init_instruction().unwrap(), vec![0]);
        assert_eq!(decode_instruction(&[0]).unwrap(), HamtInstruction::Init);
    }

    #[test]
    fn test_decode_rejects_length_past_end() {
        let mut data = encode_set_instruction("key", 1).unwrap();
        data[1..5].copy_from_slice(&u32::MAX.to_le_bytes());
        assert_matches!(
            decode_instruction(&data),
            Err(HamtError::MalformedRecord(_))
        );
    }

    #[test_case(&[] ; "empty")]
    #[test_case(&[3] ; "unknown tag")]
    #[test_case(&[2, 1, 0, 0, 0, b'k'] ; "missing value")]
    #[test_case(&[0, 0] ; "trailing byte")]
    fn test_decode_rejects_malformed(data: &[u8]) {
        assert_matches!(decode_instruction(data), Err(HamtError::MalformedRecord(_)));
    }
}
