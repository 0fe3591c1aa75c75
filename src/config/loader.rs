//! Configuration loading: `.env`, TOML file, then environment overrides.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::Settings;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILENAME: &str = "orderscout.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery). Must exist.
    pub config_path: Option<PathBuf>,
    /// Skip environment variable overrides.
    pub ignore_env: bool,
}

/// Load settings according to `options`.
pub fn load_settings(options: &LoadOptions) -> Result<Settings, ConfigError> {
    let settings = match &options.config_path {
        Some(path) => read_file(path)?,
        None => {
            let candidate = PathBuf::from(DEFAULT_CONFIG_FILENAME);
            if candidate.exists() {
                read_file(&candidate)?
            } else {
                debug!("No {} found, using defaults", DEFAULT_CONFIG_FILENAME);
                Settings::default()
            }
        }
    };

    Ok(if options.ignore_env {
        settings
    } else {
        settings.with_env_overrides()
    })
}

fn read_file(path: &Path) -> Result<Settings, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded config from {:?}", path);
    Ok(settings)
}
