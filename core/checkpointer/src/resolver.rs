use std::collections::{BTreeMap, BTreeSet};

use light_indexer_types::{
    BlockHeight,
    Checkpoint,
    Commitment,
    Config,
    ConsensusError,
    ResolveError,
    StaleConfigError,
};

/// A normalized checkpoint and the committee that reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedCheckpoint {
    pub committee: String,
    pub checkpoint: Checkpoint,
}

/// The checkpoint a quorum of committees agreed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub checkpoint: Checkpoint,
    /// Committees that reported the accepted checkpoint.
    pub agreeing: BTreeSet<String>,
    /// Configured committees that did not report it.
    pub missing: BTreeSet<String>,
}

/// Selects the most recent checkpoint that enough committees agree on.
#[derive(Debug, Clone)]
pub struct ConsensusResolver {
    meta_protocol: String,
    committees: BTreeSet<String>,
    quorum: usize,
    minimal_checkpoint: BlockHeight,
}

impl ConsensusResolver {
    pub fn new(
        meta_protocol: impl Into<String>,
        committees: BTreeSet<String>,
        quorum: usize,
        minimal_checkpoint: BlockHeight,
    ) -> Self {
        Self {
            meta_protocol: meta_protocol.into(),
            committees,
            quorum,
            minimal_checkpoint,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.verification.meta_protocol.clone(),
            config.committees(),
            config.quorum(),
            config.verification.minimal_checkpoint,
        )
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    /// Walk the reported heights from the highest down and accept the first height that is
    /// reported by every configured committee or by at least `quorum` of them. Every checkpoint
    /// inspected on the way must carry the same commitment as the others at its height,
    /// including checkpoints from different sources of one committee.
    pub fn resolve(&self, checkpoints: &[SourcedCheckpoint]) -> Result<Resolution, ResolveError> {
        let mut by_height: BTreeMap<BlockHeight, Vec<&SourcedCheckpoint>> = BTreeMap::new();
        for sourced in checkpoints {
            if sourced.checkpoint.meta_protocol != self.meta_protocol {
                tracing::debug!(
                    "ignoring {} checkpoint from {}",
                    sourced.checkpoint.meta_protocol,
                    sourced.committee
                );
                continue;
            }
            if !self.committees.contains(&sourced.committee) {
                tracing::warn!("ignoring checkpoint from unknown committee {}", sourced.committee);
                continue;
            }
            by_height
                .entry(sourced.checkpoint.height)
                .or_default()
                .push(sourced);
        }

        if by_height.is_empty() {
            return Err(ConsensusError::NoCheckpoints.into());
        }

        for (height, group) in by_height.iter().rev() {
            let commitments: BTreeSet<Commitment> =
                group.iter().map(|s| s.checkpoint.commitment).collect();
            if commitments.len() > 1 {
                tracing::warn!(
                    "committees disagree at height {height}: {:?}",
                    group
                        .iter()
                        .map(|s| (&s.committee, s.checkpoint.commitment))
                        .collect::<Vec<_>>()
                );
                return Err(ConsensusError::Conflict {
                    height: *height,
                    commitments: commitments.into_iter().collect(),
                }
                .into());
            }

            let agreeing: BTreeSet<String> = group.iter().map(|s| s.committee.clone()).collect();
            if agreeing.len() < self.quorum && agreeing != self.committees {
                tracing::debug!(
                    "height {height} is reported by {} of {} committees, quorum is {}",
                    agreeing.len(),
                    self.committees.len(),
                    self.quorum
                );
                continue;
            }

            if *height < self.minimal_checkpoint {
                return Err(StaleConfigError {
                    height: *height,
                    minimal: self.minimal_checkpoint,
                }
                .into());
            }

            let missing = self.committees.difference(&agreeing).cloned().collect();
            return Ok(Resolution {
                checkpoint: group[0].checkpoint.clone(),
                agreeing,
                missing,
            });
        }

        Err(ConsensusError::InsufficientQuorum {
            required: self.quorum,
        }
        .into())
    }
}
