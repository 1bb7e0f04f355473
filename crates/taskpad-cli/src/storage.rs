use std::path::PathBuf;

use crate::config::Config;
use color_eyre::Result;
use dirs::data_dir;
use taskpad_storage::JsonFileStore;
use tracing::debug;

/// Resolve the default data directory for Taskpad.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("taskpad"))
}

/// Build the durable store, honoring a config override for the data dir.
pub fn store_from_config(config: &Config) -> Result<JsonFileStore> {
    let root = match &config.data_dir {
        Some(root) => root.clone(),
        None => default_data_dir()?,
    };
    debug!(?root, "initializing durable store");
    Ok(JsonFileStore::new(root))
}
