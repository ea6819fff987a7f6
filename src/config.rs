//! Client configuration
//!
//! Layered as defaults, then an optional TOML file, then `SONIC__` prefixed
//! environment variables (`SONIC__SUBMIT__TIMEOUT_MS=60000`). A `.env` file
//! is loaded first when present.

use crate::confirmation::ConfirmationOptions;
use crate::network::Commitment;
use crate::queue::QueueConfig;
use crate::transaction::{PriorityConfig, SubmitSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SONIC";

/// Cluster endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    pub rpc_url: String,
    pub ws_url: String,
    pub explorer_url: String,
    pub cluster: String,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            rpc_url: crate::DEFAULT_RPC_URL.to_string(),
            ws_url: crate::DEFAULT_WS_URL.to_string(),
            explorer_url: crate::DEFAULT_EXPLORER_URL.to_string(),
            cluster: crate::DEFAULT_CLUSTER.to_string(),
        }
    }
}

/// Submission timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitSection {
    pub commitment: Commitment,
    pub legacy_commitment: Commitment,
    pub timeout_ms: u64,
    pub rebroadcast_interval_ms: u64,
    pub status_poll_interval_ms: u64,
    pub pre_sign_delay_ms: u64,
    pub query_status: bool,
    pub diagnostics_capacity: usize,
}

impl Default for SubmitSection {
    fn default() -> Self {
        Self {
            commitment: Commitment::Confirmed,
            legacy_commitment: Commitment::Processed,
            timeout_ms: 180_000,
            rebroadcast_interval_ms: 500,
            status_poll_interval_ms: 2_000,
            pre_sign_delay_ms: 1_000,
            query_status: false,
            diagnostics_capacity: 64,
        }
    }
}

/// Batch queue timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSection {
    pub tx_interval_ms: u64,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            tx_interval_ms: 500,
        }
    }
}

/// Local keypair location for the demo wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletSection {
    pub keypair_path: String,
}

impl Default for WalletSection {
    fn default() -> Self {
        Self {
            keypair_path: "~/.config/solana/id.json".to_string(),
        }
    }
}

/// Complete client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub network: NetworkSection,
    pub submit: SubmitSection,
    pub queue: QueueSection,
    pub priority: PriorityConfig,
    pub wallet: WalletSection,
}

impl ClientConfig {
    /// Load from defaults, an optional file and the environment
    #[cfg(feature = "config-file")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        use config::{Config, Environment, File};

        if dotenv::dotenv().is_ok() {
            tracing::debug!("Loaded .env file");
        }

        let mut builder = Config::builder().add_source(Config::try_from(&ClientConfig::default())?);
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::Invalid(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            tracing::debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: ClientConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        tracing::info!(
            "Configuration loaded (rpc {}, cluster {})",
            config.network.rpc_url,
            config.network.cluster
        );
        Ok(config)
    }

    /// Defaults only, after validating them
    #[cfg(not(feature = "config-file"))]
    pub fn load(_path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv();
        let config = ClientConfig::default();
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would stall or spin the pipeline
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.rpc_url.trim().is_empty() {
            return Err(ConfigError::Invalid("network.rpc_url is empty".to_string()));
        }
        let intervals = [
            ("submit.timeout_ms", self.submit.timeout_ms),
            ("submit.rebroadcast_interval_ms", self.submit.rebroadcast_interval_ms),
            ("submit.status_poll_interval_ms", self.submit.status_poll_interval_ms),
            ("queue.tx_interval_ms", self.queue.tx_interval_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{} must be greater than zero", name)));
        }
        Ok(())
    }

    pub fn submit_settings(&self) -> SubmitSettings {
        SubmitSettings {
            commitment: self.submit.commitment,
            legacy_commitment: self.submit.legacy_commitment,
            timeout: Duration::from_millis(self.submit.timeout_ms),
            rebroadcast_interval: Duration::from_millis(self.submit.rebroadcast_interval_ms),
            query_status: self.submit.query_status,
            status_poll_interval: Duration::from_millis(self.submit.status_poll_interval_ms),
            pre_sign_delay: Duration::from_millis(self.submit.pre_sign_delay_ms),
            diagnostics_capacity: self.submit.diagnostics_capacity,
        }
    }

    /// Batch settings; queued transactions confirm at the legacy commitment
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            tx_interval: Duration::from_millis(self.queue.tx_interval_ms),
            confirmation: ConfirmationOptions {
                timeout: Duration::from_millis(self.submit.timeout_ms),
                commitment: self.submit.legacy_commitment,
                query_status: self.submit.query_status,
                poll_interval: Duration::from_millis(self.submit.status_poll_interval_ms),
            },
        }
    }

    /// Keypair path with a leading `~` expanded
    pub fn keypair_path(&self) -> PathBuf {
        expand_home(&self.wallet.keypair_path)
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => Path::new(&home).join(rest),
        _ => PathBuf::from(path),
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[cfg(feature = "config-file")]
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cluster() {
        let config = ClientConfig::default();
        assert_eq!(config.network.rpc_url, "https://devnet.sonic.game");
        assert_eq!(config.network.ws_url, "wss://devnet.sonic.game");
        assert_eq!(config.network.explorer_url, crate::DEFAULT_EXPLORER_URL);
        assert_eq!(config.submit.timeout_ms, 180_000);
        assert_eq!(config.submit.commitment, Commitment::Confirmed);
        assert_eq!(config.submit.legacy_commitment, Commitment::Processed);
        assert_eq!(config.priority, PriorityConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = ClientConfig::default();
        config.submit.rebroadcast_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("rebroadcast_interval_ms"));
    }

    #[test]
    fn test_validate_rejects_empty_rpc_url() {
        let mut config = ClientConfig::default();
        config.network.rpc_url = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_submit_settings_conversion() {
        let mut config = ClientConfig::default();
        config.submit.timeout_ms = 30_000;
        config.submit.query_status = true;
        let settings = config.submit_settings();
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(settings.query_status);
        assert_eq!(settings.pre_sign_delay, Duration::from_secs(1));

        let queue = config.queue_config();
        assert_eq!(queue.tx_interval, Duration::from_millis(500));
        assert_eq!(queue.confirmation.commitment, Commitment::Processed);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/tmp/id.json"), PathBuf::from("/tmp/id.json"));
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(
                expand_home("~/.config/solana/id.json"),
                Path::new(&home).join(".config/solana/id.json")
            );
        }
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_load_from_toml_file() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[network]\nrpc_url = \"http://127.0.0.1:8899\"\n\n[submit]\ncommitment = \"recent\"\ntimeout_ms = 5000\n\n[priority]\ncompute_unit_limit = 400000\npriority_fee_micro_lamports = 500"
        )
        .unwrap();

        let config = ClientConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.network.rpc_url, "http://127.0.0.1:8899");
        assert_eq!(config.network.cluster, "devnet");
        assert_eq!(config.submit.commitment, Commitment::Processed);
        assert_eq!(config.submit.timeout_ms, 5_000);
        assert_eq!(config.priority, PriorityConfig::new(400_000, 500));
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_load_missing_file_fails() {
        let result = ClientConfig::load(Some(Path::new("/nonexistent/sonic.toml")));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn test_load_rejects_invalid_values() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[queue]\ntx_interval_ms = 0").unwrap();

        let result = ClientConfig::load(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
