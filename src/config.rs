use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants;
use crate::error::{EtlError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EtlConfig {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_region_a")]
    pub region_a: PathBuf,
    #[serde(default = "default_region_b")]
    pub region_b: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_region_a() -> PathBuf {
    PathBuf::from(constants::REGION_A_SOURCE)
}

fn default_region_b() -> PathBuf {
    PathBuf::from(constants::REGION_B_SOURCE)
}

fn default_database_path() -> PathBuf {
    PathBuf::from(constants::DATABASE_PATH)
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            region_a: default_region_a(),
            region_b: default_region_b(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl EtlConfig {
    /// Load the config file at `config_path`, falling back to the built-in defaults
    /// when the file does not exist.
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(config_path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        let config: EtlConfig = toml::from_str(&config_content)?;
        Ok(config)
    }
}
