use std::sync::Arc;

use async_trait::async_trait;
use light_indexer_balances::BalanceVerifier;
use light_indexer_interfaces::LightIndexerInterface;
use light_indexer_syncronizer::{EngineContext, Syncronizer};
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
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// One light indexer engine. Every instance owns its own index, status and sync loop.
pub struct LightIndexer {
    state: Mutex<State>,
    warmup: Arc<Notify>,
}

enum State {
    Unconfigured,
    Configured(Arc<EngineContext>),
    Running {
        ctx: Arc<EngineContext>,
        shutdown: CancellationToken,
        handle: JoinHandle<()>,
    },
    ShutDown(Arc<EngineContext>),
}

impl State {
    fn context(&self) -> Option<&Arc<EngineContext>> {
        match self {
            State::Unconfigured => None,
            State::Configured(ctx) | State::ShutDown(ctx) | State::Running { ctx, .. } => Some(ctx),
        }
    }
}

impl Default for LightIndexer {
    fn default() -> Self {
        Self::new()
    }
}

impl LightIndexer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Unconfigured),
            warmup: Arc::new(Notify::new()),
        }
    }

    /// Start the loop with a prepared syncronizer. The engine must be configured.
    pub fn start_with(
        &self,
        build: impl FnOnce(Arc<EngineContext>) -> anyhow::Result<Syncronizer>,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let ctx = match &*state {
            State::Unconfigured => return Err(EngineError::NotConfigured),
            State::Running { .. } => return Err(EngineError::AlreadyRunning),
            State::ShutDown(_) => return Err(EngineError::ShutDown),
            State::Configured(ctx) => ctx.clone(),
        };

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| EngineError::Startup(e.to_string()))?;
        let syncronizer =
            build(ctx.clone()).map_err(|e| EngineError::Startup(format!("{e:#}")))?;

        let shutdown = CancellationToken::new();
        let handle = runtime.spawn({
            let shutdown = shutdown.clone();
            let warmup = self.warmup.clone();
            async move { syncronizer.run(shutdown, warmup).await }
        });
        info!("light indexer started");

        *state = State::Running {
            ctx,
            shutdown,
            handle,
        };
        Ok(())
    }

    fn verifier(&self) -> Result<BalanceVerifier, QueryError> {
        self.state
            .lock()
            .context()
            .map(|ctx| ctx.verifier())
            .ok_or(QueryError::NotReady)
    }
}

#[async_trait]
impl LightIndexerInterface for LightIndexer {
    fn set_config(&self, config: Config) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if !matches!(*state, State::Unconfigured) {
            return Err(EngineError::AlreadyConfigured);
        }
        config.validate()?;
        *state = State::Configured(Arc::new(EngineContext::new(config)));
        Ok(())
    }

    fn initialize(&self) -> Result<(), EngineError> {
        self.start_with(Syncronizer::from_config)
    }

    fn warmup(&self) -> Result<(), EngineError> {
        match &*self.state.lock() {
            State::Unconfigured => Err(EngineError::NotConfigured),
            State::Configured(_) => Err(EngineError::NotRunning),
            State::ShutDown(_) => Err(EngineError::ShutDown),
            State::Running { .. } => {
                self.warmup.notify_one();
                Ok(())
            },
        }
    }

    fn status(&self) -> Result<VerificationStatus, EngineError> {
        self.state
            .lock()
            .context()
            .map(|ctx| ctx.status())
            .ok_or(EngineError::NotConfigured)
    }

    fn get_block_height(&self) -> Result<BlockHeight, QueryError> {
        self.verifier()?.get_block_height()
    }

    fn get_balance_of_pkscript(
        &self,
        tick: &str,
        pkscript: &str,
    ) -> Result<Verified<BalanceOfPkScript>, QueryError> {
        self.verifier()?.get_balance_of_pkscript(tick, pkscript)
    }

    fn get_balance_of_wallet(
        &self,
        tick: &str,
        wallet: &str,
    ) -> Result<Verified<BalanceOfWallet>, QueryError> {
        self.verifier()?.get_balance_of_wallet(tick, wallet)
    }

    fn get_current_checkpoints(&self) -> Result<Vec<Checkpoint>, QueryError> {
        self.verifier()?.get_current_checkpoints()
    }

    fn get_last_checkpoint(&self) -> Result<Checkpoint, QueryError> {
        self.verifier()?.get_last_checkpoint()
    }

    async fn shutdown(&self) {
        let running = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, State::Unconfigured) {
                State::Running {
                    ctx,
                    shutdown,
                    handle,
                } => {
                    *state = State::ShutDown(ctx);
                    Some((shutdown, handle))
                },
                State::Configured(ctx) | State::ShutDown(ctx) => {
                    *state = State::ShutDown(ctx);
                    None
                },
                State::Unconfigured => None,
            }
        };

        if let Some((shutdown, handle)) = running {
            shutdown.cancel();
            if let Err(e) = handle.await {
                error!("sync loop did not exit cleanly: {e}");
            }
            info!("light indexer shut down");
        }
    }
}
