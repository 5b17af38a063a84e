use std::sync::Arc;

use light_indexer_balances::{BalanceIndex, BalanceVerifier};
use light_indexer_types::{BlockTip, Checkpoint, Config, VerificationStatus};
use tokio::sync::watch;

/// State shared by one engine's sync loop and its readers.
pub struct EngineContext {
    pub config: Arc<Config>,
    pub index: BalanceIndex,
    pub status: watch::Sender<VerificationStatus>,
    pub tip: watch::Sender<Option<BlockTip>>,
    pub current_checkpoints: watch::Sender<Option<Vec<Checkpoint>>>,
}

impl EngineContext {
    pub fn new(config: Config) -> Self {
        let index = BalanceIndex::new(config.verification.meta_protocol.clone());
        Self {
            config: Arc::new(config),
            index,
            status: watch::channel(VerificationStatus::Verifying).0,
            tip: watch::channel(None).0,
            current_checkpoints: watch::channel(None).0,
        }
    }

    pub fn verifier(&self) -> BalanceVerifier {
        BalanceVerifier::new(
            self.index.clone(),
            self.tip.subscribe(),
            self.current_checkpoints.subscribe(),
            self.config.syncronizer.max_lag,
        )
    }

    pub fn status(&self) -> VerificationStatus {
        *self.status.borrow()
    }
}
