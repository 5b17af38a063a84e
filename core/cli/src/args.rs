use clap::{ArgAction, Parser, Subcommand};
use light_indexer_node::config::default_config_path;

#[derive(Parser)]
#[command(about, name = "light-indexer", version)]
pub struct Args {
    /// Path to the toml (or `.json`) configuration file
    #[arg(short, long, global = true, default_value_t = default_config_path().to_string_lossy().into_owned())]
    pub config: String,
    /// Enable code locations when printing logs.
    #[arg(long, global = true, default_value_t = false)]
    pub with_log_locations: bool,
    /// Increases the level of verbosity (the max level is -vv).
    #[arg(short, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the light indexer until interrupted.
    Run,
    /// Print the loaded configuration.
    PrintConfig {
        /// Print the default configuration instead of loading the current one.
        #[arg(short, long)]
        default: bool,
    },
}
