use thiserror::Error;

use crate::StateRootHash;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateTreeError {
    #[error("state root mismatch (expected {expected}, computed {computed})")]
    RootMismatch {
        expected: StateRootHash,
        computed: StateRootHash,
    },

    #[error("duplicate leaf key 0x{0}")]
    DuplicateKey(String),

    #[error("invalid proof: {0}")]
    InvalidProof(String),
}

impl StateTreeError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        StateTreeError::InvalidProof(reason.into())
    }
}
