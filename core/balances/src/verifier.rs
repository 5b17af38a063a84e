use std::cmp::Reverse;
use std::sync::Arc;

use light_indexer_types::{
    Amount,
    BalanceOfPkScript,
    BalanceOfWallet,
    BlockHeight,
    BlockTip,
    Checkpoint,
    QueryError,
    Verified,
};
use tokio::sync::watch;
use tracing::warn;

use crate::{BalanceIndex, BalanceSnapshot, ProofError, WalletProof};

/// Answers balance queries from the last applied snapshot. Nothing here touches the network.
#[derive(Clone)]
pub struct BalanceVerifier {
    index: BalanceIndex,
    tip: watch::Receiver<Option<BlockTip>>,
    current_checkpoints: watch::Receiver<Option<Vec<Checkpoint>>>,
    max_lag: BlockHeight,
}

impl BalanceVerifier {
    pub fn new(
        index: BalanceIndex,
        tip: watch::Receiver<Option<BlockTip>>,
        current_checkpoints: watch::Receiver<Option<Vec<Checkpoint>>>,
        max_lag: BlockHeight,
    ) -> Self {
        Self {
            index,
            tip,
            current_checkpoints,
            max_lag,
        }
    }

    pub fn get_balance_of_pkscript(
        &self,
        tick: &str,
        pkscript: &str,
    ) -> Result<Verified<BalanceOfPkScript>, QueryError> {
        let snapshot = self.fresh_snapshot()?;
        let (available_balance, overall_balance, proof) = snapshot.prove(tick, pkscript);
        Ok(Verified {
            result: BalanceOfPkScript {
                available_balance,
                overall_balance,
            },
            proof: proof.encode().map_err(proof_error)?,
        })
    }

    /// Sum the balances of every script associated with `wallet`. The reported `pkscript` is the
    /// script holding the largest overall balance, the smallest script on ties, and empty when
    /// the wallet has no scripts.
    pub fn get_balance_of_wallet(
        &self,
        tick: &str,
        wallet: &str,
    ) -> Result<Verified<BalanceOfWallet>, QueryError> {
        let snapshot = self.fresh_snapshot()?;

        let mut available_balance = Amount::zero();
        let mut overall_balance = Amount::zero();
        let mut best: Option<(Amount, &str)> = None;
        let mut scripts = Vec::new();
        for pkscript in snapshot.scripts_of(wallet).into_iter().flatten() {
            let (available, overall, proof) = snapshot.prove(tick, pkscript);
            available_balance = available_balance + &available;
            overall_balance = overall_balance + &overall;
            if best
                .as_ref()
                .map_or(true, |(amount, script)| {
                    (&overall, Reverse(pkscript.as_str())) > (amount, Reverse(*script))
                })
            {
                best = Some((overall, pkscript.as_str()));
            }
            scripts.push(proof);
        }

        let proof = WalletProof {
            wallet: wallet.to_string(),
            scripts,
        };
        Ok(Verified {
            result: BalanceOfWallet {
                available_balance,
                overall_balance,
                pkscript: best
                    .map(|(_, script)| script.to_string())
                    .unwrap_or_default(),
            },
            proof: proof.encode().map_err(proof_error)?,
        })
    }

    /// The latest checkpoint of each reachable committee from the last pass.
    pub fn get_current_checkpoints(&self) -> Result<Vec<Checkpoint>, QueryError> {
        self.current_checkpoints
            .borrow()
            .clone()
            .ok_or(QueryError::NotReady)
    }

    pub fn get_last_checkpoint(&self) -> Result<Checkpoint, QueryError> {
        self.index
            .snapshot()
            .checkpoint()
            .cloned()
            .ok_or(QueryError::NoCheckpoint)
    }

    pub fn get_block_height(&self) -> Result<BlockHeight, QueryError> {
        self.tip
            .borrow()
            .as_ref()
            .map(|tip| tip.height)
            .ok_or(QueryError::BlockHeightUnknown)
    }

    /// The current snapshot, provided a checkpoint was accepted and it is within `max_lag` of
    /// the last observed tip.
    fn fresh_snapshot(&self) -> Result<Arc<BalanceSnapshot>, QueryError> {
        let snapshot = self.index.snapshot();
        let accepted = snapshot
            .checkpoint()
            .map(|c| c.height)
            .ok_or(QueryError::NotReady)?;
        if let Some(tip) = self.tip.borrow().as_ref() {
            if tip.height.saturating_sub(accepted) > self.max_lag {
                return Err(QueryError::Stale {
                    accepted,
                    live: tip.height,
                    max_lag: self.max_lag,
                });
            }
        }
        Ok(snapshot)
    }
}

fn proof_error(error: ProofError) -> QueryError {
    warn!("{error}");
    QueryError::Proof(error.to_string())
}
