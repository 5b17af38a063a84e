use std::path::Path;

use anyhow::Result;
use light_indexer_node::config::{load_config, serialize_config};
use light_indexer_types::Config;

pub fn exec(default: bool, config_path: &Path) -> Result<()> {
    let config = match default {
        true => Config::default(),
        false => load_config(config_path)?,
    };
    println!("{}", serialize_config(&config)?);
    Ok(())
}
