use crate::{SimpleHash, SimpleHasher};

/// State root hash of the merkle tree.
pub type StateRootHash = SimpleHash;

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;
const EMPTY_PREFIX: u8 = 0x02;

/// The encoded key of a leaf in the tree. Leaves are ordered by the raw bytes of this key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateKey(Vec<u8>);

impl StateKey {
    /// Build a key from its parts. Each part is length prefixed so that distinct part lists never
    /// encode to the same bytes.
    pub fn from_parts<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        Self(encode_parts(parts))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Concatenate byte strings, each prefixed with its big-endian `u64` length.
///
/// Lengths are widened, never truncated: `usize` is at most 64 bits on every supported target.
pub fn encode_parts<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Vec<u8> {
    let mut buf = Vec::new();
    for part in parts {
        buf.extend_from_slice(&(part.len() as u64).to_be_bytes());
        buf.extend_from_slice(part);
    }
    buf
}

pub(crate) fn hash_leaf<H: SimpleHasher>(key: &[u8], value: &[u8]) -> SimpleHash {
    let mut hasher = H::new();
    hasher.update(&[LEAF_PREFIX]);
    hasher.update(&(key.len() as u64).to_be_bytes());
    hasher.update(key);
    hasher.update(value);
    hasher.finalize().into()
}

pub(crate) fn hash_node<H: SimpleHasher>(left: &SimpleHash, right: &SimpleHash) -> SimpleHash {
    let mut hasher = H::new();
    hasher.update(&[NODE_PREFIX]);
    hasher.update(left.as_ref());
    hasher.update(right.as_ref());
    hasher.finalize().into()
}

pub(crate) fn empty_root<H: SimpleHasher>() -> StateRootHash {
    SimpleHash::build::<H>([EMPTY_PREFIX])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_key_parts_are_unambiguous() {
        let a = StateKey::from_parts([b"ab".as_slice(), b"c".as_slice()]);
        let b = StateKey::from_parts([b"a".as_slice(), b"bc".as_slice()]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_parts_carry_full_width_length() {
        let encoded = encode_parts([b"abc".as_slice(), b"".as_slice()]);
        assert_eq!(
            encoded,
            [&3u64.to_be_bytes()[..], b"abc".as_slice(), &0u64.to_be_bytes()[..]].concat()
        );
    }
}
