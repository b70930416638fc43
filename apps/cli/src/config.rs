//! Client configuration loading

use anyhow::{Context, Result};
use gatekeep_types::ClientConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Config file looked up in the data directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("gatekeep"))
        .unwrap_or_else(|| PathBuf::from(".gatekeep"))
}

/// Load the client configuration.
///
/// An explicit path must exist. Otherwise `<data_dir>/config.json` is used
/// when present, and built-in defaults when not. A relative update directory
/// is resolved against the data directory.
pub fn load(explicit: Option<&Path>, data_dir: &Path) -> Result<ClientConfig> {
    let mut config = match explicit {
        Some(path) => read(path)?,
        None => {
            let path = data_dir.join(DEFAULT_CONFIG_FILE);
            if path.exists() {
                read(&path)?
            } else {
                debug!(path = %path.display(), "No config file, using defaults");
                ClientConfig::default()
            }
        }
    };

    if config.update_dir.is_relative() {
        config.update_dir = data_dir.join(&config.update_dir);
    }
    if config.soft_id.is_empty() {
        warn!("No software identifier configured; the service will reject requests");
    }

    Ok(config)
}

fn read(path: &Path) -> Result<ClientConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = serde_json::from_str(&raw)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    debug!(path = %path.display(), "Loaded config");
    Ok(config)
}
