use async_trait::async_trait;
use bytes::Bytes;
use light_indexer_interfaces::{CheckpointSourceInterface, FetchRequest};
use light_indexer_types::{CommitteeSource, FetchError, SourceDa};
use url::Url;

use crate::origin::get_document;

/// Reads checkpoint blobs from a data availability namespace through an HTTP gateway.
pub struct DaOrigin {
    client: reqwest::Client,
    source: CommitteeSource,
    namespace: SourceDa,
    gateway: Option<Url>,
}

impl DaOrigin {
    pub fn new(client: reqwest::Client, namespace: SourceDa, gateway: Option<Url>) -> Self {
        Self {
            client,
            source: CommitteeSource::Da(namespace.clone()),
            namespace,
            gateway,
        }
    }

    pub fn blob_url(&self, request: &FetchRequest) -> Result<Url, FetchError> {
        let gateway = self
            .gateway
            .as_ref()
            .ok_or_else(|| FetchError::UnknownNetwork(self.namespace.network.clone()))?;

        let mut url = gateway.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                FetchError::Unreachable(format!("da gateway {gateway} cannot be a base"))
            })?;
            segments
                .pop_if_empty()
                .push("namespaces")
                .push(&self.namespace.namespace_id)
                .push("checkpoints");
            match &request.target {
                Some(tip) => segments.push(&tip.height.to_string()).push(&tip.hash),
                None => segments.push("latest"),
            };
        }

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("name", &self.namespace.name)
                .append_pair("metaProtocol", &request.meta_protocol);
            if let Some(since) = request.since {
                query.append_pair("since", &since.to_string());
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl CheckpointSourceInterface for DaOrigin {
    fn source(&self) -> &CommitteeSource {
        &self.source
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Bytes, FetchError> {
        let url = self.blob_url(request)?;
        get_document(&self.client, url).await
    }
}
