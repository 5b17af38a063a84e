mod indexer;
mod origin;
mod tip;

pub use indexer::LightIndexerInterface;
pub use origin::{CheckpointSourceInterface, FetchRequest};
pub use tip::BlockTipProviderInterface;

pub mod types {
    pub use light_indexer_types::*;
}
