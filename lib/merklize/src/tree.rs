use std::marker::PhantomData;

use crate::types::{empty_root, hash_leaf, hash_node};
use crate::{
    InclusionProof,
    NeighbourLeaf,
    NonMembershipProof,
    SimpleHash,
    SimpleHasher,
    StateKey,
    StateProof,
    StateRootHash,
    StateTreeError,
};

/// An immutable binary merkle tree over leaves sorted by key.
///
/// Each level pairs adjacent nodes left to right. A trailing node without a sibling is promoted
/// to the next level unchanged. Because leaves are sorted, absence of a key is proven by showing
/// the two adjacent leaves that surround it.
#[derive(Debug, Clone)]
pub struct MerkleTree<H: SimpleHasher> {
    leaves: Vec<(StateKey, Vec<u8>)>,
    levels: Vec<Vec<SimpleHash>>,
    _hasher: PhantomData<H>,
}

impl<H: SimpleHasher> MerkleTree<H> {
    pub fn empty() -> Self {
        Self {
            leaves: Vec::new(),
            levels: vec![Vec::new()],
            _hasher: PhantomData,
        }
    }

    /// Build a tree from key-value pairs in any order. Keys must be unique.
    pub fn build(
        leaves: impl IntoIterator<Item = (StateKey, Vec<u8>)>,
    ) -> Result<Self, StateTreeError> {
        let mut leaves: Vec<_> = leaves.into_iter().collect();
        leaves.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some(pair) = leaves.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(StateTreeError::DuplicateKey(hex::encode(
                pair[0].0.as_bytes(),
            )));
        }

        let mut levels = Vec::new();
        let mut current: Vec<SimpleHash> = leaves
            .iter()
            .map(|(key, value)| hash_leaf::<H>(key.as_bytes(), value))
            .collect();

        while current.len() > 1 {
            let next = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_node::<H>(left, right),
                    [single] => *single,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(std::mem::replace(&mut current, next));
        }
        levels.push(current);

        Ok(Self {
            leaves,
            levels,
            _hasher: PhantomData,
        })
    }

    pub fn root(&self) -> StateRootHash {
        match self.levels.last().and_then(|level| level.first()) {
            Some(root) => *root,
            None => empty_root::<H>(),
        }
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn get(&self, key: &StateKey) -> Option<&[u8]> {
        self.position(key)
            .ok()
            .map(|index| self.leaves[index].1.as_slice())
    }

    /// Look up a key and return its value together with a proof of membership, or a proof of
    /// non-membership when the key is absent.
    pub fn get_with_proof(&self, key: &StateKey) -> (Option<&[u8]>, StateProof) {
        match self.position(key) {
            Ok(index) => (
                Some(self.leaves[index].1.as_slice()),
                StateProof::Membership(self.inclusion_proof(index)),
            ),
            Err(insert_at) => {
                let left = insert_at.checked_sub(1).map(|index| self.neighbour(index));
                let right = (insert_at < self.leaves.len()).then(|| self.neighbour(insert_at));
                (
                    None,
                    StateProof::NonMembership(NonMembershipProof {
                        leaf_count: self.leaves.len() as u64,
                        left,
                        right,
                    }),
                )
            },
        }
    }

    fn position(&self, key: &StateKey) -> Result<usize, usize> {
        self.leaves.binary_search_by(|(k, _)| k.cmp(key))
    }

    fn neighbour(&self, index: usize) -> NeighbourLeaf {
        let (key, value) = &self.leaves[index];
        NeighbourLeaf {
            key: key.as_bytes().to_vec(),
            value: value.clone(),
            proof: self.inclusion_proof(index),
        }
    }

    fn inclusion_proof(&self, index: usize) -> InclusionProof {
        let mut siblings = Vec::new();
        let mut pos = index;
        for level in &self.levels[..self.levels.len() - 1] {
            if pos % 2 == 1 {
                siblings.push(level[pos - 1]);
            } else if pos + 1 < level.len() {
                siblings.push(level[pos + 1]);
            }
            pos /= 2;
        }
        InclusionProof {
            index: index as u64,
            leaf_count: self.leaves.len() as u64,
            siblings,
        }
    }
}
