use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use light_indexer_checkpointer::{
    conflict_evidence,
    CheckpointDocument,
    ConsensusResolver,
    DenyEntry,
    DenyList,
    Evidence,
    Normalizer,
    Resolution,
};
use light_indexer_fetcher::Fetcher;
use light_indexer_interfaces::{BlockTipProviderInterface, FetchRequest};
use light_indexer_types::{
    BlockTip,
    Checkpoint,
    ConsensusError,
    IndexApplyError,
    ResolveError,
    VerificationStatus,
};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::{timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{BitcoinRpc, EngineContext};

/// What one successful sync pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    /// The tip observed this pass, if the rpc answered.
    pub tip: Option<BlockTip>,
    /// Documents that were fetched and parsed.
    pub documents: usize,
    /// Sources that failed to fetch or parse.
    pub failures: usize,
    /// The checkpoint the committees agreed on.
    pub resolved: Checkpoint,
    /// Whether the index moved to `resolved` this pass.
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PassError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Apply(#[from] IndexApplyError),
}

/// Drives the periodic fetch, resolve and apply cycle of one engine.
pub struct Syncronizer {
    ctx: Arc<EngineContext>,
    fetcher: Fetcher,
    tip_provider: Arc<dyn BlockTipProviderInterface>,
    normalizer: Normalizer,
    resolver: ConsensusResolver,
    deny_list: Mutex<DenyList>,
}

impl Syncronizer {
    pub fn new(
        ctx: Arc<EngineContext>,
        fetcher: Fetcher,
        tip_provider: Arc<dyn BlockTipProviderInterface>,
        deny_list: DenyList,
    ) -> Self {
        let normalizer = Normalizer::from_config(&ctx.config.verification);
        let resolver = ConsensusResolver::from_config(&ctx.config);
        Self {
            ctx,
            fetcher,
            tip_provider,
            normalizer,
            resolver,
            deny_list: Mutex::new(deny_list),
        }
    }

    /// Wire up the real sources and the bitcoind client described by the context config.
    pub fn from_config(ctx: Arc<EngineContext>) -> Result<Self> {
        let config = ctx.config.clone();
        let deny_list = match &config.deny_list_path {
            Some(path) => DenyList::load(path)?,
            None => DenyList::in_memory(),
        };
        let fetcher = Fetcher::from_config(&config, |source| deny_list.is_denied(source))?;
        if fetcher.is_empty() {
            warn!("every configured source is on the deny list");
        }
        for source in fetcher.sources() {
            debug!("fetching checkpoints from {source}");
        }
        let rpc = BitcoinRpc::new(
            &config.verification.bitcoin_rpc,
            config.syncronizer.rpc_timeout,
        )
        .context("failed to create bitcoin rpc client")?;
        Ok(Self::new(ctx, fetcher, Arc::new(rpc), deny_list))
    }

    /// Run passes every `interval` until `shutdown` is cancelled. A notification on `warmup`
    /// starts a pass right away.
    pub async fn run(&self, shutdown: CancellationToken, warmup: Arc<Notify>) {
        let mut interval = tokio::time::interval(self.ctx.config.syncronizer.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {},
                _ = warmup.notified() => debug!("warmup requested"),
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                result = self.pass() => match result {
                    Ok(report) => info!(
                        "sync pass done: checkpoint {} ({} documents, {} failed sources, applied: {})",
                        report.resolved.height,
                        report.documents,
                        report.failures,
                        report.applied
                    ),
                    Err(e) => warn!("sync pass failed: {e}"),
                },
            }
        }
        info!("syncronizer shut down");
    }

    /// One sync pass. The verification status is updated from its outcome.
    pub async fn pass(&self) -> Result<PassReport, PassError> {
        let result = self.sync().await;
        let status = match &result {
            Ok(_) => self.status_after_success(),
            Err(_) => VerificationStatus::Unverified,
        };
        if self.ctx.status.send_replace(status) != status {
            info!("verification status is now {status}");
        }
        result
    }

    async fn sync(&self) -> Result<PassReport, PassError> {
        let tip = self.fetch_tip().await;
        let request = FetchRequest {
            meta_protocol: self.ctx.config.verification.meta_protocol.clone(),
            target: tip.clone(),
            since: self.ctx.index.accepted_height(),
        };

        let mut failures = 0;
        let mut documents = Vec::new();
        for outcome in self.fetcher.fetch_all(&request).await {
            if self.deny_list.lock().is_denied(&outcome.source) {
                debug!("dropping document from denied source {}", outcome.source);
                continue;
            }
            // Fetch failures are logged by the fetcher.
            let Ok(body) = outcome.result else {
                failures += 1;
                continue;
            };
            match self.normalizer.normalize(&outcome.source, &body) {
                Ok(document) => documents.push(document),
                Err(e) => {
                    warn!("invalid checkpoint document from {}: {e}", outcome.source);
                    failures += 1;
                },
            }
        }

        self.publish_current_checkpoints(&documents);

        let sourced: Vec<_> = documents.iter().map(CheckpointDocument::sourced).collect();
        let resolution = match self.resolver.resolve(&sourced) {
            Ok(resolution) => resolution,
            Err(e) => {
                if let ResolveError::Consensus(ConsensusError::Conflict { height, .. }) = &e {
                    for entry in conflict_evidence(&documents, *height, self.resolver.quorum()) {
                        self.deny(entry);
                    }
                }
                return Err(e.into());
            },
        };
        if !resolution.missing.is_empty() {
            debug!(
                "checkpoint {} not reported by {:?}",
                resolution.checkpoint.height, resolution.missing
            );
        }

        let applied = self.apply(&resolution, &documents)?;
        Ok(PassReport {
            tip,
            documents: documents.len(),
            failures,
            resolved: resolution.checkpoint,
            applied,
        })
    }

    /// Ask for the live tip. A failure leaves the last observed tip in place.
    async fn fetch_tip(&self) -> Option<BlockTip> {
        let rpc_timeout = self.ctx.config.syncronizer.rpc_timeout;
        match timeout(rpc_timeout, self.tip_provider.best_block()).await {
            Ok(Ok(tip)) => {
                debug!("live tip is {} ({})", tip.height, tip.hash);
                self.ctx.tip.send_replace(Some(tip.clone()));
                Some(tip)
            },
            Ok(Err(e)) => {
                warn!("failed to get the live tip: {e:#}");
                None
            },
            Err(_) => {
                warn!("timed out after {rpc_timeout:?} waiting for the live tip");
                None
            },
        }
    }

    fn publish_current_checkpoints(&self, documents: &[CheckpointDocument]) {
        let mut latest: BTreeMap<&str, &Checkpoint> = BTreeMap::new();
        for document in documents {
            let checkpoint = &document.checkpoint;
            latest
                .entry(document.committee())
                .and_modify(|current| {
                    if checkpoint.height > current.height {
                        *current = checkpoint;
                    }
                })
                .or_insert(checkpoint);
        }
        let current = latest.into_values().cloned().collect();
        self.ctx.current_checkpoints.send_replace(Some(current));
    }

    /// Move the index to the resolved checkpoint using the first agreeing document whose deltas
    /// reproduce the commitment. Returns whether the index changed.
    fn apply(
        &self,
        resolution: &Resolution,
        documents: &[CheckpointDocument],
    ) -> Result<bool, IndexApplyError> {
        let resolved = &resolution.checkpoint;
        let accepted = self.ctx.index.snapshot().checkpoint().cloned();
        if let Some(accepted) = &accepted {
            if resolved.conflicts_with(accepted) {
                error!(
                    "committees now agree on {} at accepted height {}, index has {}",
                    resolved.commitment, accepted.height, accepted.commitment
                );
                return Err(IndexApplyError::ConflictsWithAccepted {
                    height: accepted.height,
                    accepted: accepted.commitment,
                    agreed: resolved.commitment,
                });
            }
            if resolved.height <= accepted.height {
                debug!("checkpoint {} is already accepted", resolved.height);
                return Ok(false);
            }
        }
        let accepted_height = accepted.map(|c| c.height);

        let candidates = documents.iter().filter(|document| {
            resolution.agreeing.contains(document.committee())
                && document.checkpoint.height == resolved.height
                && document.checkpoint.commitment == resolved.commitment
                && document
                    .base_height
                    .map_or(true, |base| accepted_height.is_some_and(|a| base <= a))
        });

        let mut last_error = IndexApplyError::MissingDocument;
        for document in candidates {
            match self.ctx.index.apply(
                &document.checkpoint,
                document.base_height,
                &document.deltas,
            ) {
                Ok(_) => return Ok(true),
                Err(e) => {
                    warn!(
                        "deltas from {} do not apply to checkpoint {}: {e}",
                        document.source, resolved.height
                    );
                    if let IndexApplyError::CommitmentMismatch { expected, computed } = &e {
                        self.deny(DenyEntry::new(
                            document.source.clone(),
                            Some(Evidence {
                                height: resolved.height,
                                hash: document.checkpoint.hash.clone(),
                                correct_commitment: *expected,
                                fraud_commitment: *computed,
                            }),
                        ));
                    }
                    last_error = e;
                },
            }
        }
        Err(last_error)
    }

    fn deny(&self, entry: DenyEntry) {
        warn!("adding source to the deny list: {entry:?}");
        if let Err(e) = self.deny_list.lock().append(entry) {
            error!("failed to persist deny list entry: {e:#}");
        }
    }

    fn status_after_success(&self) -> VerificationStatus {
        let Some(accepted) = self.ctx.index.accepted_height() else {
            return VerificationStatus::Unverified;
        };
        let config = &self.ctx.config;
        let tip = self.ctx.tip.borrow().as_ref().map(|tip| tip.height);
        match tip {
            Some(tip)
                if accepted >= config.verification.minimal_checkpoint
                    && tip.saturating_sub(accepted) <= config.syncronizer.max_lag =>
            {
                VerificationStatus::Verified
            },
            _ => VerificationStatus::Unverified,
        }
    }

    pub fn context(&self) -> &Arc<EngineContext> {
        &self.ctx
    }

    /// Sources currently on the deny list.
    pub fn denied(&self) -> Vec<DenyEntry> {
        self.deny_list.lock().entries().to_vec()
    }
}
