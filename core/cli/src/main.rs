use anyhow::Result;
use light_indexer_cli::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Create the tokio runtime and execute the cli
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(cli.exec())
}
