//! Wallet configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::transfer::TransferConfig;

/// Environment variable overriding the wallet home directory.
pub const HOME_ENV: &str = "NIGHT_WALLET_HOME";

/// Configuration for the wallet CLI.
///
/// Loaded from `config.toml` in the wallet home directory; every field has a
/// default so an empty or missing file is valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Network used when no flag or address selects one.
    #[serde(default)]
    pub default_network: Option<String>,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// JSON-RPC endpoint of the wallet engine.
    #[serde(default = "default_engine_url")]
    pub engine_url: String,

    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Time bounds, in seconds unless noted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_subscription_secs")]
    pub subscription_secs: u64,
    #[serde(default = "default_sync_secs")]
    pub sync_secs: u64,
    #[serde(default = "default_resync_secs")]
    pub resync_secs: u64,
    #[serde(default = "default_dust_secs")]
    pub dust_secs: u64,
    #[serde(default = "default_dust_poll_ms")]
    pub dust_poll_ms: u64,
    #[serde(default = "default_proof_secs")]
    pub proof_secs: u64,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_engine_url() -> String {
    "http://127.0.0.1:9955".to_string()
}

fn default_subscription_secs() -> u64 {
    120
}

fn default_sync_secs() -> u64 {
    300
}

fn default_resync_secs() -> u64 {
    60
}

fn default_dust_secs() -> u64 {
    300
}

fn default_dust_poll_ms() -> u64 {
    5_000
}

fn default_proof_secs() -> u64 {
    300
}

fn default_ttl_secs() -> u64 {
    1_800
}

// ── Impl ───────────────────────────────────────────────────────────────

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            subscription_secs: default_subscription_secs(),
            sync_secs: default_sync_secs(),
            resync_secs: default_resync_secs(),
            dust_secs: default_dust_secs(),
            dust_poll_ms: default_dust_poll_ms(),
            proof_secs: default_proof_secs(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn subscription_budget(&self) -> Duration {
        Duration::from_secs(self.subscription_secs)
    }

    pub fn transfer_config(&self) -> TransferConfig {
        TransferConfig {
            sync_timeout: Duration::from_secs(self.sync_secs),
            resync_timeout: Duration::from_secs(self.resync_secs),
            dust_timeout: Duration::from_secs(self.dust_secs),
            dust_poll_interval: Duration::from_millis(self.dust_poll_ms),
            proof_timeout: Duration::from_secs(self.proof_secs),
            ttl: Duration::from_secs(self.ttl_secs),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            default_network: None,
            log_level: default_log_level(),
            log_format: default_log_format(),
            engine_url: default_engine_url(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl WalletConfig {
    /// `$NIGHT_WALLET_HOME/config.toml`, else `~/.night-wallet/config.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = match std::env::var_os(HOME_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .ok_or(ConfigError::NoHome)?
                .join(".night-wallet"),
        };
        Ok(home.join("config.toml"))
    }

    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_toml_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Write the configuration, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |e: std::io::Error| ConfigError::Write {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, self.to_toml_string()?).map_err(write_err)
    }
}
