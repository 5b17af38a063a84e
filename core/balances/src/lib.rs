mod index;
mod proof;
mod snapshot;
mod verifier;

pub use index::{commitment_of, BalanceIndex};
pub use proof::{BalanceProof, ProofError, WalletProof};
pub use snapshot::{BalanceKey, BalanceSnapshot};
pub use verifier::BalanceVerifier;

/// Hasher of the balance commitment tree.
pub type CommitmentHasher = merklize::hashers::Blake3Hasher;
