use async_trait::async_trait;
use bytes::Bytes;
use light_indexer_types::{BlockHeight, BlockTip, CommitteeSource, FetchError};

/// What a sync pass asks every source for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub meta_protocol: String,
    /// The live tip observed this pass. Without it sources serve their latest checkpoint.
    pub target: Option<BlockTip>,
    /// Height of the checkpoint the local index is already at.
    pub since: Option<BlockHeight>,
}

/// An origin of raw checkpoint documents for one committee.
///
/// Implementations perform the network call and nothing else: no parsing, no retries.
#[async_trait]
pub trait CheckpointSourceInterface: Send + Sync {
    /// The configuration entry this origin was built from.
    fn source(&self) -> &CommitteeSource;

    /// Download the checkpoint document that answers `request`.
    async fn fetch(&self, request: &FetchRequest) -> Result<Bytes, FetchError>;
}
