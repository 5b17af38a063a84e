use std::collections::BTreeMap;
use std::sync::Arc;

use light_indexer_types::{
    BalanceDelta,
    BalanceRecord,
    BlockHeight,
    Checkpoint,
    Commitment,
    IndexApplyError,
};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::{BalanceKey, BalanceSnapshot};

/// The local balance view. Readers take an [`Arc`] of the current snapshot and never observe a
/// partially applied checkpoint; writers build a new snapshot and swap it in.
#[derive(Clone)]
pub struct BalanceIndex {
    current: Arc<RwLock<Arc<BalanceSnapshot>>>,
    apply_lock: Arc<Mutex<()>>,
}

impl BalanceIndex {
    pub fn new(meta_protocol: impl Into<String>) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(BalanceSnapshot::empty(
                meta_protocol.into(),
            )))),
            apply_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn snapshot(&self) -> Arc<BalanceSnapshot> {
        self.current.read().clone()
    }

    /// Height of the accepted checkpoint, if any.
    pub fn accepted_height(&self) -> Option<BlockHeight> {
        self.snapshot().checkpoint().map(|c| c.height)
    }

    /// Apply the deltas of `checkpoint` and make it the accepted checkpoint.
    ///
    /// Without `base_height` the deltas are a full snapshot of the state. With it they are
    /// upserts over the state at `base_height`, which must not be newer than the accepted
    /// checkpoint. The resulting state must hash to the checkpoint commitment, otherwise nothing
    /// changes.
    pub fn apply(
        &self,
        checkpoint: &Checkpoint,
        base_height: Option<BlockHeight>,
        deltas: &[BalanceDelta],
    ) -> Result<Arc<BalanceSnapshot>, IndexApplyError> {
        let _guard = self.apply_lock.lock();
        let current = self.snapshot();

        if checkpoint.meta_protocol != current.meta_protocol() {
            return Err(IndexApplyError::MetaProtocolMismatch {
                expected: current.meta_protocol().to_string(),
                found: checkpoint.meta_protocol.clone(),
            });
        }

        let accepted = current.checkpoint().map(|c| c.height);
        if let Some(accepted_checkpoint) = current.checkpoint() {
            if accepted_checkpoint.height == checkpoint.height
                && accepted_checkpoint.commitment == checkpoint.commitment
            {
                debug!("checkpoint {} is already applied", checkpoint.height);
                return Ok(current);
            }
            if checkpoint.height <= accepted_checkpoint.height {
                return Err(IndexApplyError::NotNewer {
                    height: checkpoint.height,
                    accepted: accepted_checkpoint.height,
                });
            }
        }

        let mut records = match base_height {
            None => BTreeMap::new(),
            Some(base) if accepted.is_some_and(|accepted| base <= accepted) => {
                current.records().clone()
            },
            Some(base) => return Err(IndexApplyError::BaseMismatch { base, accepted }),
        };
        upsert(&mut records, deltas);

        let next = BalanceSnapshot::build(
            current.meta_protocol().to_string(),
            Some(checkpoint.clone()),
            records,
        )?;
        let computed = next.commitment();
        if computed != checkpoint.commitment {
            return Err(IndexApplyError::CommitmentMismatch {
                expected: checkpoint.commitment,
                computed,
            });
        }

        info!(
            "applied checkpoint {} ({} deltas, {} records)",
            checkpoint.height,
            deltas.len(),
            next.len()
        );
        let next = Arc::new(next);
        *self.current.write() = next.clone();
        Ok(next)
    }
}

fn upsert(records: &mut BTreeMap<BalanceKey, BalanceRecord>, deltas: &[BalanceDelta]) {
    for delta in deltas {
        let key = BalanceKey::new(&delta.tick, &delta.pkscript);
        let record = delta.record();
        if record.is_empty() {
            records.remove(&key);
        } else {
            records.insert(key, record);
        }
    }
}

/// The commitment of the state described by `deltas` applied to an empty index.
pub fn commitment_of<'a>(
    deltas: impl IntoIterator<Item = &'a BalanceDelta>,
) -> Result<Commitment, IndexApplyError> {
    let deltas: Vec<BalanceDelta> = deltas.into_iter().cloned().collect();
    let mut records = BTreeMap::new();
    upsert(&mut records, &deltas);
    Ok(BalanceSnapshot::build(String::new(), None, records)?.commitment())
}
