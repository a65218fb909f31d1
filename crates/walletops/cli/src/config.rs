//! CLI configuration

use crate::error::{CliError, CliResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CliConfig {
    /// Ledger file location
    pub ledger_path: Option<PathBuf>,

    /// Network used when `op` is given none
    pub default_network: Option<String>,

    /// JSON-RPC request timeout in seconds
    pub rpc_timeout_seconds: Option<u64>,

    /// Receipt polling interval in milliseconds
    pub confirm_poll_millis: Option<u64>,
}

impl CliConfig {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> CliResult<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: CliConfig =
                toml::from_str(&contents).map_err(|e| CliError::Config(e.to_string()))?;
            Ok(config)
        } else {
            Ok(CliConfig::default())
        }
    }

    /// Configured ledger path, or the per-user data directory.
    pub fn ledger_path(&self) -> CliResult<PathBuf> {
        if let Some(path) = &self.ledger_path {
            return Ok(path.clone());
        }
        let data_dir =
            dirs::data_dir().ok_or_else(|| CliError::Config("Cannot find data directory".into()))?;
        Ok(data_dir.join("walletops").join("ledger.json"))
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_seconds.unwrap_or(30))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_millis.unwrap_or(1000))
    }

    /// Get the default configuration file path
    fn default_config_path() -> CliResult<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| CliError::Config("Cannot find config directory".into()))?;
        Ok(config_dir.join("walletops").join("config.toml"))
    }
}
