use async_trait::async_trait;
use bytes::Bytes;
use light_indexer_interfaces::{CheckpointSourceInterface, FetchRequest};
use light_indexer_types::{CommitteeSource, FetchError, SourceS3};
use url::Url;

use crate::origin::get_document;

/// Reads checkpoint objects from an S3 bucket.
///
/// Objects are named `checkpoint-{name}-{metaProtocol}-{height}-{hash}.json`. When the pass has
/// no target block the committee's `checkpoint-{name}-{metaProtocol}-latest.json` is read
/// instead.
pub struct S3Origin {
    client: reqwest::Client,
    source: CommitteeSource,
    bucket: SourceS3,
    endpoint: Option<Url>,
}

impl S3Origin {
    pub fn new(client: reqwest::Client, bucket: SourceS3, endpoint: Option<Url>) -> Self {
        Self {
            client,
            source: CommitteeSource::S3(bucket.clone()),
            bucket,
            endpoint,
        }
    }

    pub fn object_key(&self, request: &FetchRequest) -> String {
        let SourceS3 { name, .. } = &self.bucket;
        let meta_protocol = &request.meta_protocol;
        match &request.target {
            Some(tip) => format!(
                "checkpoint-{name}-{meta_protocol}-{}-{}.json",
                tip.height, tip.hash
            ),
            None => format!("checkpoint-{name}-{meta_protocol}-latest.json"),
        }
    }

    pub fn object_url(&self, key: &str) -> Result<Url, FetchError> {
        let SourceS3 { region, bucket, .. } = &self.bucket;
        match &self.endpoint {
            Some(endpoint) => {
                let mut url = endpoint.clone();
                url.path_segments_mut()
                    .map_err(|_| {
                        FetchError::Unreachable(format!("s3 endpoint {endpoint} cannot be a base"))
                    })?
                    .pop_if_empty()
                    .push(bucket)
                    .push(key);
                Ok(url)
            },
            None => Url::parse(&format!("https://{bucket}.s3.{region}.amazonaws.com/{key}"))
                .map_err(|e| FetchError::Unreachable(format!("invalid bucket url: {e}"))),
        }
    }
}

#[async_trait]
impl CheckpointSourceInterface for S3Origin {
    fn source(&self) -> &CommitteeSource {
        &self.source
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Bytes, FetchError> {
        let url = self.object_url(&self.object_key(request))?;
        get_document(&self.client, url).await
    }
}
