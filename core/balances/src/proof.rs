use std::collections::BTreeSet;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use light_indexer_types::{
    normalize_tick,
    Amount,
    BalanceOfPkScript,
    BalanceOfWallet,
    BalanceRecord,
    Commitment,
};
use merklize::{StateProof, StateTreeError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::snapshot::{encode_record, BalanceKey};
use crate::CommitmentHasher;

#[derive(Debug, Error)]
pub enum ProofError {
    #[error("failed to encode proof: {0}")]
    Encode(String),
    #[error("failed to decode proof: {0}")]
    Decode(String),
    #[error(transparent)]
    Tree(#[from] StateTreeError),
    #[error("proof does not match the result: {0}")]
    Mismatch(String),
}

/// Proof of one `(tick, pkscript)` balance against a checkpoint commitment.
///
/// `record` is the committed leaf, or `None` when the proof shows the key is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceProof {
    pub tick: String,
    pub pkscript: String,
    pub record: Option<BalanceRecord>,
    pub proof: StateProof,
}

impl BalanceProof {
    /// Check that the proof answers `(tick, pkscript)` with exactly `result` under `commitment`.
    pub fn verify(
        &self,
        commitment: &Commitment,
        tick: &str,
        pkscript: &str,
        result: &BalanceOfPkScript,
    ) -> Result<(), ProofError> {
        self.check_key(tick, pkscript)?;
        let (available, overall) = self.balance();
        if available != result.available_balance || overall != result.overall_balance {
            return Err(ProofError::Mismatch(format!(
                "proven balance of {}/{} differs from the result",
                self.tick, self.pkscript
            )));
        }
        self.verify_record(commitment)
    }

    fn check_key(&self, tick: &str, pkscript: &str) -> Result<(), ProofError> {
        if self.tick != normalize_tick(tick) || self.pkscript != pkscript {
            return Err(ProofError::Mismatch(format!(
                "proof is for {}/{}, not {tick}/{pkscript}",
                self.tick, self.pkscript
            )));
        }
        Ok(())
    }

    /// Check the proven record against `commitment` alone.
    fn verify_record(&self, commitment: &Commitment) -> Result<(), ProofError> {
        let key = BalanceKey::new(&self.tick, &self.pkscript).state_key();
        let root = (*commitment).into();
        match &self.record {
            Some(record) => self.proof.verify_membership::<CommitmentHasher>(
                &key,
                &encode_record(record),
                root,
            )?,
            None => self
                .proof
                .verify_non_membership::<CommitmentHasher>(&key, root)?,
        }
        Ok(())
    }

    /// The proven `(available, overall)` balance.
    pub fn balance(&self) -> (Amount, Amount) {
        match &self.record {
            Some(record) => (
                record.available_balance.clone(),
                record.overall_balance.clone(),
            ),
            None => (Amount::zero(), Amount::zero()),
        }
    }

    pub fn encode(&self) -> Result<String, ProofError> {
        encode(self)
    }

    pub fn decode(proof: &str) -> Result<Self, ProofError> {
        decode(proof)
    }
}

/// Proofs for every script associated with a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletProof {
    pub wallet: String,
    pub scripts: Vec<BalanceProof>,
}

impl WalletProof {
    /// Check every script proof of `tick` for `wallet` and that the aggregated result is their
    /// sum.
    pub fn verify(
        &self,
        commitment: &Commitment,
        tick: &str,
        wallet: &str,
        result: &BalanceOfWallet,
    ) -> Result<(), ProofError> {
        if self.wallet != wallet {
            return Err(ProofError::Mismatch(format!(
                "proof is for wallet {}, not {wallet}",
                self.wallet
            )));
        }
        let mut available = Amount::zero();
        let mut overall = Amount::zero();
        let mut seen = BTreeSet::new();
        for script in &self.scripts {
            script.check_key(tick, &script.pkscript)?;
            if !seen.insert(script.pkscript.as_str()) {
                return Err(ProofError::Mismatch(format!(
                    "script {} is proven twice",
                    script.pkscript
                )));
            }
            script.verify_record(commitment)?;
            if let Some(wallet) = script.record.as_ref().and_then(|r| r.wallet.as_ref()) {
                if wallet != &self.wallet {
                    return Err(ProofError::Mismatch(format!(
                        "script {} belongs to {wallet}",
                        script.pkscript
                    )));
                }
            }
            let (a, o) = script.balance();
            available = available + a;
            overall = overall + o;
        }

        if available != result.available_balance || overall != result.overall_balance {
            return Err(ProofError::Mismatch(
                "aggregated balance differs from the proven scripts".to_string(),
            ));
        }
        let pkscript_proven = self.scripts.iter().any(|s| s.pkscript == result.pkscript);
        if !(pkscript_proven || (self.scripts.is_empty() && result.pkscript.is_empty())) {
            return Err(ProofError::Mismatch(format!(
                "pkscript {:?} is not part of the proof",
                result.pkscript
            )));
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<String, ProofError> {
        encode(self)
    }

    pub fn decode(proof: &str) -> Result<Self, ProofError> {
        decode(proof)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String, ProofError> {
    let bytes = bincode::serialize(value).map_err(|e| ProofError::Encode(e.to_string()))?;
    Ok(STANDARD.encode(bytes))
}

fn decode<T: serde::de::DeserializeOwned>(proof: &str) -> Result<T, ProofError> {
    let bytes = STANDARD
        .decode(proof)
        .map_err(|e| ProofError::Decode(e.to_string()))?;
    bincode::deserialize(&bytes).map_err(|e| ProofError::Decode(e.to_string()))
}
