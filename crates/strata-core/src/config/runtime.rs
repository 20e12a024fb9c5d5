//! Runtime configuration types

use crate::error::{Error, Result};
use crate::utils::parse_time_us;
use serde::{Deserialize, Serialize};

/// Largest value a catalog long-text column can hold
pub const MAX_LONGTEXT_LENGTH: usize = 536_870_911;

/// Complete runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Log archive defaults
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Path list codec limits
    #[serde(default)]
    pub codec: CodecConfig,

    /// Scheduling timeouts
    #[serde(default)]
    pub timeout: TimeoutConfig,
}

impl RuntimeConfig {
    /// Check that every duration string parses and limits are positive
    pub fn validate(&self) -> Result<()> {
        self.archive.piece_switch_interval_us()?;
        self.archive.lag_target_us()?;
        if self.codec.max_text_length == 0 {
            return Err(Error::invalid_config("codec.max-text-length must be positive"));
        }
        if self.timeout.default_timeout_us <= 0 {
            return Err(Error::invalid_config(
                "timeout.default-timeout-us must be positive",
            ));
        }
        Ok(())
    }
}

/// Log archive defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArchiveConfig {
    /// How often a new piece is started, e.g. `1d`
    #[serde(default = "default_piece_switch_interval")]
    pub piece_switch_interval: String,

    /// Tolerated archive lag, e.g. `120s`
    #[serde(default = "default_lag_target")]
    pub lag_target: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            piece_switch_interval: default_piece_switch_interval(),
            lag_target: default_lag_target(),
        }
    }
}

impl ArchiveConfig {
    pub fn piece_switch_interval_us(&self) -> Result<i64> {
        parse_time_us(&self.piece_switch_interval).map_err(|e| {
            Error::invalid_config(format!("archive.piece-switch-interval: {}", e))
        })
    }

    pub fn lag_target_us(&self) -> Result<i64> {
        parse_time_us(&self.lag_target)
            .map_err(|e| Error::invalid_config(format!("archive.lag-target: {}", e)))
    }
}

/// Path list codec limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CodecConfig {
    /// Maximum encoded length of a persisted path list
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_text_length: default_max_text_length(),
        }
    }
}

/// Scheduling timeouts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TimeoutConfig {
    /// Default deadline for a timeout context, in microseconds
    #[serde(default = "default_timeout_us")]
    pub default_timeout_us: i64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_timeout_us: default_timeout_us(),
        }
    }
}

fn default_piece_switch_interval() -> String {
    "1d".to_string()
}
fn default_lag_target() -> String {
    "120s".to_string()
}
fn default_max_text_length() -> usize {
    MAX_LONGTEXT_LENGTH
}
fn default_timeout_us() -> i64 {
    2_000_000 // 2 seconds
}
