use std::fmt;
use std::str::FromStr;

use merklize::StateRootHash;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DeserializeFromStr, DisplayFromStr, PickFirst, SerializeDisplay};
use thiserror::Error;

use crate::BlockHeight;

/// Digest binding a checkpoint to the balance state it represents.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub struct Commitment([u8; 32]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitmentError {
    #[error("commitment is not valid hex: {0}")]
    Hex(String),
    #[error("commitment must be {expected} bytes, got {found}")]
    Length { expected: usize, found: usize },
}

impl Commitment {
    pub const LEN: usize = 32;

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for Commitment {
    type Err = CommitmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| CommitmentError::Hex(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CommitmentError::Length {
                expected: Self::LEN,
                found: bytes.len(),
            })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({self})")
    }
}

impl From<StateRootHash> for Commitment {
    fn from(root: StateRootHash) -> Self {
        Self(root.into())
    }
}

impl From<Commitment> for StateRootHash {
    fn from(commitment: Commitment) -> Self {
        StateRootHash::new(commitment.0)
    }
}

/// A committed snapshot of meta-protocol state at a base-chain height.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub commitment: Commitment,
    pub hash: String,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub height: BlockHeight,
    pub meta_protocol: String,
    pub version: String,
    pub name: String,
    pub url: String,
}

impl Checkpoint {
    /// Two checkpoints conflict when they claim different state for the same height.
    pub fn conflicts_with(&self, other: &Checkpoint) -> bool {
        self.height == other.height
            && self.meta_protocol == other.meta_protocol
            && self.commitment != other.commitment
    }
}

/// The best block of the base chain as reported by the RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTip {
    pub height: BlockHeight,
    pub hash: String,
}
