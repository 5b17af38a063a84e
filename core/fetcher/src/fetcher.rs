use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use futures::future::join_all;
use light_indexer_interfaces::{CheckpointSourceInterface, FetchRequest};
use light_indexer_types::{CommitteeSource, Config, FetchError};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{DaOrigin, S3Origin};

/// The result of asking one source for its checkpoint document.
#[derive(Debug)]
pub struct FetchOutcome {
    pub source: CommitteeSource,
    pub result: Result<Bytes, FetchError>,
}

/// Fans a fetch request out to every configured source.
#[derive(Clone)]
pub struct Fetcher {
    origins: Vec<Arc<dyn CheckpointSourceInterface>>,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(origins: Vec<Arc<dyn CheckpointSourceInterface>>, timeout: Duration) -> Self {
        Self { origins, timeout }
    }

    /// Build an origin for every configured source that `is_denied` does not reject.
    pub fn from_config(
        config: &Config,
        is_denied: impl Fn(&CommitteeSource) -> bool,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetcher.timeout)
            .build()
            .context("failed to build http client")?;

        let mut origins: Vec<Arc<dyn CheckpointSourceInterface>> = Vec::new();
        for source in config.sources() {
            if is_denied(&source) {
                warn!("skipping denied source {source}");
                continue;
            }
            match source {
                CommitteeSource::S3(bucket) => origins.push(Arc::new(S3Origin::new(
                    client.clone(),
                    bucket,
                    config.fetcher.s3_endpoint.clone(),
                ))),
                CommitteeSource::Da(namespace) => {
                    let gateway = config.fetcher.da_gateways.get(&namespace.network).cloned();
                    origins.push(Arc::new(DaOrigin::new(client.clone(), namespace, gateway)))
                },
            }
        }

        Ok(Self::new(origins, config.fetcher.timeout))
    }

    pub fn sources(&self) -> impl Iterator<Item = &CommitteeSource> {
        self.origins.iter().map(|origin| origin.source())
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Fetch from every source concurrently. Each source gets the same time budget and a slow
    /// or failing source never affects the others.
    pub async fn fetch_all(&self, request: &FetchRequest) -> Vec<FetchOutcome> {
        let fetches = self.origins.iter().map(|origin| async move {
            let result = match timeout(self.timeout, origin.fetch(request)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(self.timeout)),
            };
            match &result {
                Ok(body) => debug!("fetched {} bytes from {}", body.len(), origin.source()),
                Err(e) => warn!("failed to fetch checkpoint from {}: {e}", origin.source()),
            }
            FetchOutcome {
                source: origin.source().clone(),
                result,
            }
        });
        join_all(fetches).await
    }
}
