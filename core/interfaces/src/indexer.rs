use async_trait::async_trait;
use light_indexer_types::{
    BalanceOfPkScript,
    BalanceOfWallet,
    BlockHeight,
    Checkpoint,
    Config,
    EngineError,
    QueryError,
    VerificationStatus,
    Verified,
};

/// The call surface an embedding adapter delegates to.
///
/// Lifecycle calls return [`EngineError`] on misuse. Query calls never block on the network and
/// report failures as [`QueryError`] values, which adapters turn into inline `error` fields.
#[async_trait]
pub trait LightIndexerInterface: Send + Sync {
    /// Set the configuration. Must be called exactly once, before [`Self::initialize`].
    fn set_config(&self, config: Config) -> Result<(), EngineError>;

    /// Start the sync loop. Calling it again is an error.
    fn initialize(&self) -> Result<(), EngineError>;

    /// Ask the sync loop for an immediate pass.
    fn warmup(&self) -> Result<(), EngineError>;

    fn status(&self) -> Result<VerificationStatus, EngineError>;

    /// Last observed live height of the base chain.
    fn get_block_height(&self) -> Result<BlockHeight, QueryError>;

    fn get_balance_of_pkscript(
        &self,
        tick: &str,
        pkscript: &str,
    ) -> Result<Verified<BalanceOfPkScript>, QueryError>;

    fn get_balance_of_wallet(
        &self,
        tick: &str,
        wallet: &str,
    ) -> Result<Verified<BalanceOfWallet>, QueryError>;

    /// Latest checkpoint of every reachable committee, unresolved.
    fn get_current_checkpoints(&self) -> Result<Vec<Checkpoint>, QueryError>;

    /// The checkpoint the committees agreed on.
    fn get_last_checkpoint(&self) -> Result<Checkpoint, QueryError>;

    /// Stop the sync loop and wait for it to exit.
    async fn shutdown(&self);
}
