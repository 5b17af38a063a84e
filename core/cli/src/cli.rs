use anyhow::Result;
use clap::Parser;
use light_indexer_node::config::resolve_path;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::args::{Args, Command};
use crate::commands::{print_config, run};

pub struct Cli {
    args: Args,
}

impl Cli {
    pub fn parse() -> Self {
        Self {
            args: Args::parse(),
        }
    }

    pub async fn exec(self) -> Result<()> {
        let config_path = resolve_path(&self.args.config);
        match self.args.cmd {
            Command::Run => {
                self.setup_logging()?;
                run::exec(&config_path).await
            },
            Command::PrintConfig { default } => print_config::exec(default, &config_path),
        }
    }

    fn setup_logging(&self) -> Result<()> {
        // Build the filter from cli args, or environment variable
        let env_filter = EnvFilter::builder()
            .with_default_directive(
                match self.args.verbose {
                    0 => LevelFilter::INFO,
                    1 => LevelFilter::DEBUG,
                    _2_or_more => LevelFilter::TRACE,
                }
                .into(),
            )
            .from_env_lossy()
            .add_directive("hyper=warn".parse()?)
            .add_directive("reqwest=warn".parse()?);

        // Initialize the registry for logging events
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(self.args.with_log_locations)
                    .with_line_number(self.args.with_log_locations),
            )
            .with(env_filter)
            .try_init()?;
        Ok(())
    }
}
