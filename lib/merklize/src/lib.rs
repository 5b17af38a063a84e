mod errors;
mod hasher;
pub mod hashers;
mod proof;
mod tree;
mod types;

pub use errors::StateTreeError;
pub use hasher::{SimpleHash, SimpleHasher};
pub use proof::{InclusionProof, NeighbourLeaf, NonMembershipProof, StateProof};
pub use tree::MerkleTree;
pub use types::{encode_parts, StateKey, StateRootHash};
