//! Config file loading.
//!
//! A relative `target.file` in a config file names a script next to that
//! config, not next to wherever the tool happens to be run from, so it is
//! anchored to the config's directory here. Configs parsed from a string have
//! no directory and keep their paths as written.

use crate::config::schema::{MigrateConfig, ValidationError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config TOML{}: {source}", origin(.path))]
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },

    #[error("invalid config{}: {source}", origin(.path))]
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

fn origin(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" ({})", p.display()))
        .unwrap_or_default()
}

pub fn load_from_str(input: &str) -> Result<MigrateConfig, ConfigError> {
    parse(input, None)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<MigrateConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut config = parse(&contents, Some(path))?;

    if let (Some(file), Some(dir)) = (&config.target.file, path.parent()) {
        if file.is_relative() && !dir.as_os_str().is_empty() {
            let anchored = dir.join(file);
            tracing::debug!(
                config = %path.display(),
                target = %anchored.display(),
                "anchored relative target to config directory"
            );
            config.target.file = Some(anchored);
        }
    }

    Ok(config)
}

fn parse(input: &str, path: Option<&Path>) -> Result<MigrateConfig, ConfigError> {
    let config: MigrateConfig =
        toml_edit::de::from_str(input).map_err(|source| ConfigError::Toml {
            path: path.map(Path::to_path_buf),
            source,
        })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation {
            path: path.map(Path::to_path_buf),
            source,
        })?;
    Ok(config)
}
