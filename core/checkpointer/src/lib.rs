//! Turns raw committee documents into a single trusted checkpoint.
//!
//! The [`Normalizer`] parses each fetched document into a [`CheckpointDocument`]: the checkpoint
//! itself plus the balance deltas needed to move the local index to it. The
//! [`ConsensusResolver`] then compares the checkpoints of all committees and accepts one only
//! when the required number of distinct committees report byte-equal commitments at the same
//! height. Disagreement is never resolved by picking a side; the pass fails and is retried.
//!
//! The [`DenyList`] keeps sources that were caught serving a commitment that contradicts a
//! quorum out of future runs.

mod deny_list;
mod document;
mod resolver;

pub use deny_list::*;
pub use document::*;
pub use resolver::*;

#[cfg(test)]
mod tests;
