use serde::{Deserialize, Serialize};

use crate::types::{empty_root, hash_leaf, hash_node};
use crate::{SimpleHash, SimpleHasher, StateKey, StateRootHash, StateTreeError};

/// Path from a leaf to the root. Levels where the node was promoted without a sibling carry no
/// entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    pub index: u64,
    pub leaf_count: u64,
    pub siblings: Vec<SimpleHash>,
}

impl InclusionProof {
    /// Recompute the root from a leaf hash.
    pub fn compute_root<H: SimpleHasher>(
        &self,
        leaf: SimpleHash,
    ) -> Result<StateRootHash, StateTreeError> {
        if self.index >= self.leaf_count {
            return Err(StateTreeError::invalid("leaf index out of range"));
        }

        let mut siblings = self.siblings.iter();
        let mut hash = leaf;
        let mut pos = self.index;
        let mut count = self.leaf_count;

        while count > 1 {
            if pos % 2 == 1 {
                let sibling = siblings
                    .next()
                    .ok_or_else(|| StateTreeError::invalid("missing sibling"))?;
                hash = hash_node::<H>(sibling, &hash);
            } else if pos + 1 < count {
                let sibling = siblings
                    .next()
                    .ok_or_else(|| StateTreeError::invalid("missing sibling"))?;
                hash = hash_node::<H>(&hash, sibling);
            }
            pos /= 2;
            count = (count + 1) / 2;
        }

        if siblings.next().is_some() {
            return Err(StateTreeError::invalid("trailing siblings"));
        }

        Ok(hash)
    }

    fn verify_leaf<H: SimpleHasher>(
        &self,
        key: &[u8],
        value: &[u8],
        root: StateRootHash,
    ) -> Result<(), StateTreeError> {
        let computed = self.compute_root::<H>(hash_leaf::<H>(key, value))?;
        if computed != root {
            return Err(StateTreeError::RootMismatch {
                expected: root,
                computed,
            });
        }
        Ok(())
    }
}

/// A leaf adjacent to an absent key, together with its inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighbourLeaf {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub proof: InclusionProof,
}

/// Proof that a key is absent: the leaves immediately before and after where it would sit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonMembershipProof {
    pub leaf_count: u64,
    pub left: Option<NeighbourLeaf>,
    pub right: Option<NeighbourLeaf>,
}

/// Proof of a state value in the tree. This is a commitment proof that can be used to verify the
/// existence or non-existence of a value in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateProof {
    Membership(InclusionProof),
    NonMembership(NonMembershipProof),
}

impl StateProof {
    /// Verify the membership of a key-value pair in the tree.
    pub fn verify_membership<H: SimpleHasher>(
        &self,
        key: &StateKey,
        value: &[u8],
        root: StateRootHash,
    ) -> Result<(), StateTreeError> {
        match self {
            StateProof::Membership(proof) => proof.verify_leaf::<H>(key.as_bytes(), value, root),
            StateProof::NonMembership(_) => {
                Err(StateTreeError::invalid("expected a membership proof"))
            },
        }
    }

    /// Verify the non-membership of a key in the tree.
    pub fn verify_non_membership<H: SimpleHasher>(
        &self,
        key: &StateKey,
        root: StateRootHash,
    ) -> Result<(), StateTreeError> {
        let StateProof::NonMembership(proof) = self else {
            return Err(StateTreeError::invalid("expected a non-membership proof"));
        };
        let key = key.as_bytes();

        if proof.leaf_count == 0 {
            if proof.left.is_some() || proof.right.is_some() {
                return Err(StateTreeError::invalid("empty tree with neighbours"));
            }
            let computed = empty_root::<H>();
            if computed != root {
                return Err(StateTreeError::RootMismatch {
                    expected: root,
                    computed,
                });
            }
            return Ok(());
        }

        for neighbour in [&proof.left, &proof.right].into_iter().flatten() {
            if neighbour.proof.leaf_count != proof.leaf_count {
                return Err(StateTreeError::invalid("leaf count mismatch"));
            }
            neighbour
                .proof
                .verify_leaf::<H>(&neighbour.key, &neighbour.value, root)?;
        }

        match (&proof.left, &proof.right) {
            (Some(left), Some(right)) => {
                if left.key.as_slice() >= key || key >= right.key.as_slice() {
                    return Err(StateTreeError::invalid("key is not between neighbours"));
                }
                if left.proof.index + 1 != right.proof.index {
                    return Err(StateTreeError::invalid("neighbours are not adjacent"));
                }
            },
            (Some(left), None) => {
                if left.key.as_slice() >= key {
                    return Err(StateTreeError::invalid("key is not after last leaf"));
                }
                if left.proof.index + 1 != proof.leaf_count {
                    return Err(StateTreeError::invalid("left neighbour is not the last leaf"));
                }
            },
            (None, Some(right)) => {
                if key >= right.key.as_slice() {
                    return Err(StateTreeError::invalid("key is not before first leaf"));
                }
                if right.proof.index != 0 {
                    return Err(StateTreeError::invalid("right neighbour is not the first leaf"));
                }
            },
            (None, None) => return Err(StateTreeError::invalid("missing neighbours")),
        }

        Ok(())
    }
}
