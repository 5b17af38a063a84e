use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use light_indexer_interfaces::LightIndexerInterface;
use light_indexer_node::config::load_config;
use light_indexer_node::LightIndexer;
use tracing::{info, warn};

const STATUS_INTERVAL: Duration = Duration::from_secs(60);

pub async fn exec(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    info!(
        "loaded config with {} committees from {}",
        config.committees().len(),
        config_path.display()
    );

    let indexer = LightIndexer::new();
    indexer
        .set_config(config)
        .context("Could not configure the light indexer.")?;
    indexer
        .initialize()
        .context("Could not start the light indexer.")?;

    let mut status_interval = tokio::time::interval(STATUS_INTERVAL);
    status_interval.tick().await;
    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!("failed to listen for ctrl-c: {e}");
                }
                break;
            },
            _ = status_interval.tick() => {
                let status = indexer.status()?;
                match indexer.get_last_checkpoint() {
                    Ok(checkpoint) => info!(
                        "status: {status}, checkpoint {} ({})",
                        checkpoint.height, checkpoint.commitment
                    ),
                    Err(e) => info!("status: {status}, {e}"),
                }
            },
        }
    }

    info!("shutting down");
    indexer.shutdown().await;
    Ok(())
}
