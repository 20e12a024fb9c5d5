//! Layered configuration loader
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Built-in defaults
//! 2. Runtime config file (`<dir>/strata-runtime.yaml`)
//! 3. Environment variables (STRATA_* prefix)

use super::runtime::RuntimeConfig;
use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::env;
use std::fs;
use tracing::debug;

/// File name of the runtime config inside the config directory
pub const RUNTIME_CONFIG_FILENAME: &str = "strata-runtime.yaml";

/// Configuration loader rooted at a directory
pub struct ConfigLoader {
    config_dir: Utf8PathBuf,
}

impl ConfigLoader {
    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Load runtime configuration with layered precedence
    pub fn load_runtime_config(&self) -> Result<RuntimeConfig> {
        let mut config = RuntimeConfig::default();

        let path = self.config_dir.join(RUNTIME_CONFIG_FILENAME);
        if path.exists() {
            debug!("Loading runtime config from {}", path);
            config = Self::load_yaml_file(&path)?;
        }

        config = Self::apply_env_overrides(config)?;
        config.validate()?;
        Ok(config)
    }

    fn load_yaml_file(path: &Utf8Path) -> Result<RuntimeConfig> {
        let content = fs::read_to_string(path)?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }

    /// Apply environment variable overrides to runtime config
    fn apply_env_overrides(mut config: RuntimeConfig) -> Result<RuntimeConfig> {
        if let Ok(val) = env::var("STRATA_PIECE_SWITCH_INTERVAL") {
            config.archive.piece_switch_interval = val;
        }

        if let Ok(val) = env::var("STRATA_LAG_TARGET") {
            config.archive.lag_target = val;
        }

        if let Ok(val) = env::var("STRATA_MAX_TEXT_LENGTH") {
            config.codec.max_text_length = val.parse().map_err(|_| {
                Error::invalid_config("STRATA_MAX_TEXT_LENGTH must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("STRATA_DEFAULT_TIMEOUT_US") {
            config.timeout.default_timeout_us = val.parse().map_err(|_| {
                Error::invalid_config("STRATA_DEFAULT_TIMEOUT_US must be a valid number")
            })?;
        }

        Ok(config)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
