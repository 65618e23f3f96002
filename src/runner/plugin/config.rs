//! Runtime configuration file parsing.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::registry::UnitError;
use crate::runner::ds::heap::HeapConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl From<ConfigError> for UnitError {
    fn from(e: ConfigError) -> Self {
        UnitError::ConfigError(e.to_string())
    }
}

/// Which program unit the runtime loads.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProgramConfig {
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    crate::sfc::UNIT_NAME.to_string()
}

impl Default for ProgramConfig {
    fn default() -> Self {
        ProgramConfig {
            unit: default_unit(),
        }
    }
}

/// Complete runtime configuration.
///
/// Expected format:
/// ```toml
/// [program]
/// unit = "sfc"
///
/// [heap]
/// max_bytes = 67108864
/// ```
/// Every section and key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub program: ProgramConfig,
    #[serde(default)]
    pub heap: HeapConfig,
}

impl RuntimeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
