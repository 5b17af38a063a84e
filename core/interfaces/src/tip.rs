use async_trait::async_trait;
use light_indexer_types::BlockTip;

/// Reports the live best block of the base chain.
#[async_trait]
pub trait BlockTipProviderInterface: Send + Sync {
    async fn best_block(&self) -> anyhow::Result<BlockTip>;
}
