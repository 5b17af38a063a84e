use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use light_indexer_types::Config;

lazy_static! {
    pub static ref LIGHT_INDEXER_HOME_DIR: PathBuf = resolve_path(
        &env::var("LIGHT_INDEXER_HOME").unwrap_or("~/.light-indexer".to_string())
    );
}

/// `config.toml` in the home directory.
pub fn default_config_path() -> PathBuf {
    LIGHT_INDEXER_HOME_DIR.join("config.toml")
}

/// Expand a leading `~` to the user's home directory.
pub fn resolve_path(path: &str) -> PathBuf {
    match (path.strip_prefix('~'), env::var_os("HOME")) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            PathBuf::from(home).join(rest.trim_start_matches('/'))
        },
        _ => PathBuf::from(path),
    }
}

/// Read a config file. Files ending in `.json` are parsed as JSON, everything else as TOML.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).with_context(|| {
        format!(
            "IO: Could not load the configuration file '{}'.",
            path.to_string_lossy()
        )
    })?;

    let mut config: Config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&content).with_context(|| {
            format!(
                "Could not parse the configuration file '{}' as json.",
                path.to_string_lossy()
            )
        })?,
        _ => toml::from_str(&content).with_context(|| {
            format!(
                "Could not parse the configuration file '{}' as toml.",
                path.to_string_lossy()
            )
        })?,
    };

    config.deny_list_path = config
        .deny_list_path
        .map(|path| resolve_path(&path.to_string_lossy()));
    if let Err(e) = config.validate() {
        bail!("Invalid configuration file '{}': {e}", path.to_string_lossy());
    }
    Ok(config)
}

pub fn serialize_config(config: &Config) -> Result<String> {
    toml::to_string(config).context("Failed to serialize the configuration.")
}
