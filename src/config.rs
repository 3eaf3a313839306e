//! Application configuration
//!
//! Read from `$XDG_CONFIG_HOME/patrimoine/config.toml` when present. Every
//! key is optional; environment variables override the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::PatrimoineError;
use crate::valuation::{YearBasis, DEFAULT_INTERVALS};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

const ENV_DB: &str = "PATRIMOINE_DB";
const ENV_API_URL: &str = "PATRIMOINE_API_URL";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SQLite register; `~/.patrimoine/data.db` when unset
    pub database_path: Option<PathBuf>,
    /// Base URL of the possessions REST backend
    pub api_url: String,
    /// Sub-intervals of a range valuation
    pub intervals: u32,
    pub year_basis: YearBasis,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            api_url: DEFAULT_API_URL.to_string(),
            intervals: DEFAULT_INTERVALS,
            year_basis: YearBasis::default(),
        }
    }
}

impl Config {
    /// Load the user configuration, falling back to defaults when no file exists
    pub fn load() -> Result<Self> {
        let config = match default_config_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides())
    }

    /// Parse a config file; a missing file yields the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .context(format!("Failed to read config file {:?}", path))?;
        let config = Self::from_toml(&raw).context(format!("Invalid config file {:?}", path))?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, PatrimoineError> {
        let config: Config =
            toml::from_str(raw).map_err(|e| PatrimoineError::Config(e.to_string()))?;
        if config.intervals == 0 {
            return Err(PatrimoineError::Config(
                "intervals must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(db) = std::env::var_os(ENV_DB).filter(|v| !v.is_empty()) {
            self.database_path = Some(PathBuf::from(db));
        }
        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.trim().is_empty() {
                self.api_url = url;
            }
        }
        self
    }
}

/// `$XDG_CONFIG_HOME/patrimoine/config.toml` (platform equivalent elsewhere)
pub fn default_config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("patrimoine").join("config.toml"))
}
