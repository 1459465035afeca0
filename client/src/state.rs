//! Account layouts owned by the trie program.
//!
//! All records are borsh encoded with no header or padding, so their sizes
//! are fixed by the field layout:
//!
//! * [`Node`]: 16 [`Slot`]s of `8 + 32 + 32` bytes, 1152 bytes in total.
//! * [`StateHeader`]: `1 + 32 + 8` bytes.
//! * [`Announcement`]: a length-prefixed url followed by two 32-byte fields.

use {
    crate::error::{HamtError, Result},
    borsh::{BorshDeserialize, BorshSerialize},
    solana_sdk::{
        hash::{hashv, Hash},
        pubkey::Pubkey,
    },
};

pub const SLOTS_PER_NODE: usize = 16;
pub const SLOT_SIZE: usize = 8 + 32 + 32;
pub const NODE_SIZE: usize = SLOTS_PER_NODE * SLOT_SIZE;
pub const STATE_SIZE: usize = 1 + 32 + 8;

/// Bits of the key digest consumed per trie level.
pub const BITS_PER_LEVEL: usize = 4;
/// Levels available before the 256-bit digest is exhausted.
pub const MAX_DEPTH: usize = 256 / BITS_PER_LEVEL;

/// One entry of a trie node.
///
/// A slot is empty when every field is zero. An occupied slot holds a value
/// for the key whose digest is `key_hash`; a non-default `link` additionally
/// points at the node holding the keys that collided with it at this depth.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Slot {
    pub value: u64,
    pub key_hash: Hash,
    pub link: Pubkey,
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        self.value == 0 && self.key_hash == Hash::default() && self.link == Pubkey::default()
    }

    pub fn is_link(&self) -> bool {
        self.link != Pubkey::default()
    }
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Node {
    pub slots: [Slot; SLOTS_PER_NODE],
}

/// Per-trie state record, created once by `Init`.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct StateHeader {
    pub initialized: bool,
    pub root: Pubkey,
    pub announcement_count: u64,
}

/// Announcement record written by `Announce`.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Announcement {
    pub url: String,
    pub hash: Hash,
    pub next: Pubkey,
}

/// Exact account size for an announcement carrying `url`.
pub fn announcement_record_size(url: &str) -> usize {
    4 + url.len() + 32 + 32
}

/// Digest used both to place a key and to recognize it in a slot.
pub fn hash_key(key: &str) -> Hash {
    hashv(&[key.as_bytes()])
}

/// Slot index for `digest` at `depth`: the depth-th nibble, high nibble of
/// each byte first. `None` once the digest is exhausted.
pub fn slot_index(digest: &Hash, depth: usize) -> Option<usize> {
    if depth >= MAX_DEPTH {
        return None;
    }
    let byte = digest.as_ref()[depth / 2];
    let nibble = if depth % 2 == 0 { byte >> 4 } else { byte & 0x0f };
    Some(nibble as usize)
}

/// Every slot index of `digest`, root level first.
pub fn slot_indices(digest: &Hash) -> impl Iterator<Item = usize> + '_ {
    digest
        .as_ref()
        .iter()
        .flat_map(|byte| [(byte >> 4) as usize, (byte & 0x0f) as usize])
}

pub fn encode_node(node: &Node) -> Result<Vec<u8>> {
    Ok(borsh::to_vec(node)?)
}

pub fn decode_node(data: &[u8]) -> Result<Node> {
    if data.len() != NODE_SIZE {
        return Err(HamtError::MalformedRecord(format!(
            "trie node must be {NODE_SIZE} bytes, got {}",
            data.len()
        )));
    }
    Ok(Node::try_from_slice(data)?)
}

pub fn encode_state(state: &StateHeader) -> Result<Vec<u8>> {
    Ok(borsh::to_vec(state)?)
}

pub fn decode_state(data: &[u8]) -> Result<StateHeader> {
    if data.len() != STATE_SIZE {
        return Err(HamtError::MalformedRecord(format!(
            "trie state must be {STATE_SIZE} bytes, got {}",
            data.len()
        )));
    }
    Ok(StateHeader::try_from_slice(data)?)
}

pub fn encode_announcement(announcement: &Announcement) -> Result<Vec<u8>> {
    Ok(borsh::to_vec(announcement)?)
}

/// Decodes an announcement record. The account is allocated to the exact
/// size, but trailing zero bytes are tolerated.
pub fn decode_announcement(data: &[u8]) -> Result<Announcement> {
    let mut cursor = data;
    let announcement = Announcement::deserialize(&mut cursor)?;
    if cursor.iter().any(|byte| *byte != 0) {
        return Err(HamtError::MalformedRecord(
            "unexpected bytes after announcement".to_string(),
        ));
    }
    Ok(announcement)
}

#[cfg(test)]
mod tests {
    use {super::*, assert_matches::assert_matches, test_case::test_case};

    fn sample_node() -> Node {
        let mut node = Node::default();
        node.slots[0] = Slot {
            value: 42,
            key_hash: hash_key("test0"),
            link: Pubkey::default(),
        };
        node.slots[15] = Slot {
            value: u64::MAX,
            key_hash: hash_key("test1"),
            link: Pubkey::new_unique(),
        };
        node
    }

    #[test]
    fn test_node_layout() {
        let node = sample_node();
        let data = encode_node(&node).unwrap();
        assert_eq!(data.len(), NODE_SIZE);
        assert_eq!(NODE_SIZE, 1152);

        // First slot: little-endian value, then the digest, then the link.
        assert_eq!(&data[..8], &42u64.to_le_bytes());
        assert_eq!(&data[8..40], hash_key("test0").as_ref());
        assert_eq!(&data[40..72], &[0; 32]);

        let last = &data[15 * SLOT_SIZE..];
        assert_eq!(&last[..8], &[0xff; 8]);
        assert_eq!(&last[40..], node.slots[15].link.as_ref());

        assert_eq!(decode_node(&data).unwrap(), node);
    }

    #[test_case(0)]
    #[test_case(NODE_SIZE - 1)]
    #[test_case(NODE_SIZE + 1)]
    fn test_decode_node_wrong_size(len: usize) {
        assert_matches!(
            decode_node(&vec![0; len]),
            Err(HamtError::MalformedRecord(_))
        );
    }

    #[test]
    fn test_empty_slot() {
        assert!(Slot::default().is_empty());
        assert!(!Slot::default().is_link());

        let slot = Slot {
            value: 0,
            key_hash: hash_key("zero"),
            link: Pubkey::default(),
        };
        assert!(!slot.is_empty());
    }

    #[test]
    fn test_state_layout() {
        let state = StateHeader {
            initialized: true,
            root: Pubkey::new_unique(),
            announcement_count: 3,
        };
        let data = encode_state(&state).unwrap();
        assert_eq!(data.len(), STATE_SIZE);
        assert_eq!(data[0], 1);
        assert_eq!(&data[1..33], state.root.as_ref());
        assert_eq!(decode_state(&data).unwrap(), state);

        let mut bad_flag = data.clone();
        bad_flag[0] = 2;
        assert_matches!(decode_state(&bad_flag), Err(HamtError::MalformedRecord(_)));
        assert_matches!(
            decode_state(&data[..33]),
            Err(HamtError::MalformedRecord(_))
        );
    }

    #[test_case("" ; "empty url")]
    #[test_case("https://example.com/" ; "plain url")]
    #[test_case("https://例え.jp/ü" ; "multibyte url")]
    fn test_announcement_size(url: &str) {
        let announcement = Announcement {
            url: url.to_string(),
            hash: hashv(&[b"content"]),
            next: Pubkey::new_unique(),
        };
        let data = encode_announcement(&announcement).unwrap();
        assert_eq!(data.len(), announcement_record_size(url));
        assert_eq!(decode_announcement(&data).unwrap(), announcement);
    }

    #[test]
    fn test_decode_announcement_rejects_overlong_url() {
        let mut data = encode_announcement(&Announcement {
            url: "abc".to_string(),
            ..Announcement::default()
        })
        .unwrap();
        data[..4].copy_from_slice(&1000u32.to_le_bytes());
        assert_matches!(
            decode_announcement(&data),
            Err(HamtError::MalformedRecord(_))
        );
    }

    #[test]
    fn test_slot_index() {
        let digest = Hash::new_from_array([
            0xab, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0xf7,
        ]);
        assert_eq!(slot_index(&digest, 0), Some(0xa));
        assert_eq!(slot_index(&digest, 1), Some(0xb));
        assert_eq!(slot_index(&digest, 2), Some(0x0));
        assert_eq!(slot_index(&digest, 3), Some(0x1));
        assert_eq!(slot_index(&digest, MAX_DEPTH - 2), Some(0xf));
        assert_eq!(slot_index(&digest, MAX_DEPTH - 1), Some(0x7));
        assert_eq!(slot_index(&digest, MAX_DEPTH), None);

        let indices = slot_indices(&digest).collect::<Vec<_>>();
        assert_eq!(indices.len(), MAX_DEPTH);
        for (depth, index) in indices.into_iter().enumerate() {
            assert_eq!(slot_index(&digest, depth), Some(index));
        }
    }

    #[test]
    fn test_slot_sequence_is_deterministic() {
        let sequence = |key: &str| {
            let digest = hash_key(key);
            (0..MAX_DEPTH)
                .map(|depth| slot_index(&digest, depth).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(sequence("test7"), sequence("test7"));
        assert_ne!(sequence("test7"), sequence("test8"));
    }
}
