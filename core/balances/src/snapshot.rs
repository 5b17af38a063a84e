use std::collections::{BTreeMap, BTreeSet, HashMap};

use light_indexer_types::{
    normalize_tick,
    Amount,
    BalanceRecord,
    Checkpoint,
    Commitment,
    IndexApplyError,
};
use merklize::{encode_parts, MerkleTree, StateKey};

use crate::{BalanceProof, CommitmentHasher};

/// Identifies one balance within a meta protocol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BalanceKey {
    pub tick: String,
    pub pkscript: String,
}

impl BalanceKey {
    pub fn new(tick: &str, pkscript: &str) -> Self {
        Self {
            tick: normalize_tick(tick),
            pkscript: pkscript.to_string(),
        }
    }

    pub fn state_key(&self) -> StateKey {
        StateKey::from_parts([self.tick.as_bytes(), self.pkscript.as_bytes()])
    }
}

/// The committed encoding of a record: wallet, available and overall balance.
pub(crate) fn encode_record(record: &BalanceRecord) -> Vec<u8> {
    let available = record.available_balance.to_string();
    let overall = record.overall_balance.to_string();
    encode_parts([
        record.wallet.as_deref().unwrap_or_default().as_bytes(),
        available.as_bytes(),
        overall.as_bytes(),
    ])
}

/// An immutable, fully applied view of the balance index.
#[derive(Debug)]
pub struct BalanceSnapshot {
    meta_protocol: String,
    checkpoint: Option<Checkpoint>,
    records: BTreeMap<BalanceKey, BalanceRecord>,
    tree: MerkleTree<CommitmentHasher>,
    wallets: HashMap<String, BTreeSet<String>>,
}

impl BalanceSnapshot {
    pub(crate) fn empty(meta_protocol: String) -> Self {
        Self {
            meta_protocol,
            checkpoint: None,
            records: BTreeMap::new(),
            tree: MerkleTree::empty(),
            wallets: HashMap::new(),
        }
    }

    /// Build the commitment tree and the wallet associations of `records`.
    pub(crate) fn build(
        meta_protocol: String,
        checkpoint: Option<Checkpoint>,
        records: BTreeMap<BalanceKey, BalanceRecord>,
    ) -> Result<Self, IndexApplyError> {
        let mut wallets: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut owners: HashMap<String, String> = HashMap::new();
        for (key, record) in &records {
            let Some(wallet) = &record.wallet else {
                continue;
            };
            if let Some(existing) = owners.get(&key.pkscript) {
                if existing != wallet {
                    return Err(IndexApplyError::WalletConflict {
                        pkscript: key.pkscript.clone(),
                        existing: existing.clone(),
                        found: wallet.clone(),
                    });
                }
            }
            owners.insert(key.pkscript.clone(), wallet.clone());
            wallets
                .entry(wallet.clone())
                .or_default()
                .insert(key.pkscript.clone());
        }

        let tree = MerkleTree::build(
            records
                .iter()
                .map(|(key, record)| (key.state_key(), encode_record(record))),
        )
        .map_err(|e| IndexApplyError::Tree(e.to_string()))?;

        Ok(Self {
            meta_protocol,
            checkpoint,
            records,
            tree,
            wallets,
        })
    }

    pub fn meta_protocol(&self) -> &str {
        &self.meta_protocol
    }

    /// The checkpoint this state was verified against.
    pub fn checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoint.as_ref()
    }

    /// Root of the commitment tree over all records.
    pub fn commitment(&self) -> Commitment {
        self.tree.root().into()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &BTreeMap<BalanceKey, BalanceRecord> {
        &self.records
    }

    pub fn get(&self, tick: &str, pkscript: &str) -> Option<&BalanceRecord> {
        self.records.get(&BalanceKey::new(tick, pkscript))
    }

    /// Scripts associated with `wallet` by any record.
    pub fn scripts_of(&self, wallet: &str) -> Option<&BTreeSet<String>> {
        self.wallets.get(wallet)
    }

    /// Balance of `(tick, pkscript)` and a proof of it against [`Self::commitment`]. An absent
    /// record reads as zero and is proven by non-membership.
    pub fn prove(&self, tick: &str, pkscript: &str) -> (Amount, Amount, BalanceProof) {
        let key = BalanceKey::new(tick, pkscript);
        let (_, proof) = self.tree.get_with_proof(&key.state_key());
        let record = self.records.get(&key).cloned();
        let (available, overall) = match &record {
            Some(record) => (
                record.available_balance.clone(),
                record.overall_balance.clone(),
            ),
            None => (Amount::zero(), Amount::zero()),
        };
        let proof = BalanceProof {
            tick: key.tick,
            pkscript: key.pkscript,
            record,
            proof,
        };
        (available, overall, proof)
    }
}
