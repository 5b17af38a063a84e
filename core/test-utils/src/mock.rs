use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use light_indexer_interfaces::{BlockTipProviderInterface, CheckpointSourceInterface, FetchRequest};
use light_indexer_types::{BlockHeight, BlockTip, CommitteeSource, FetchError};
use parking_lot::Mutex;

use crate::fixtures::{block_hash, s3_source};

/// A checkpoint source that serves whatever the test sets.
pub struct MockSource {
    source: CommitteeSource,
    response: Mutex<Result<Bytes, FetchError>>,
    delay: Mutex<Option<Duration>>,
    requests: Mutex<Vec<FetchRequest>>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new(source: CommitteeSource) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Err(FetchError::NotFound(source.to_string()))),
            source,
            delay: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    /// An S3 source of committee `name`.
    pub fn s3(name: &str) -> Arc<Self> {
        Self::new(CommitteeSource::S3(s3_source(name)))
    }

    pub fn set_document(&self, document: Vec<u8>) {
        *self.response.lock() = Ok(document.into());
    }

    pub fn set_error(&self, error: FetchError) {
        *self.response.lock() = Err(error);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<FetchRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl CheckpointSourceInterface for MockSource {
    fn source(&self) -> &CommitteeSource {
        &self.source
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.response.lock().clone()
    }
}

/// A base-chain tip provider controlled by the test. Fails while no height is set.
#[derive(Default)]
pub struct MockTip {
    tip: Mutex<Option<BlockTip>>,
}

impl MockTip {
    pub fn at(height: BlockHeight) -> Arc<Self> {
        let tip = Self::default();
        tip.set_height(height);
        Arc::new(tip)
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_height(&self, height: BlockHeight) {
        *self.tip.lock() = Some(BlockTip {
            height,
            hash: block_hash(height),
        });
    }

    pub fn fail(&self) {
        *self.tip.lock() = None;
    }
}

#[async_trait]
impl BlockTipProviderInterface for MockTip {
    async fn best_block(&self) -> anyhow::Result<BlockTip> {
        self.tip
            .lock()
            .clone()
            .ok_or_else(|| anyhow!("rpc unavailable"))
    }
}
