use serde::{Deserialize, Serialize};
use config::{Config, ConfigError, File};
use std::path::{Path, PathBuf};

use crate::config::RpcSettings;
use crate::wallet::FileWalletStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub app: AppSettings,
    pub wallet: WalletSettings,
    pub aggregator: AggregatorSettings,
    pub rpc: RpcSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorSettings {
    pub base_url: String,
    /// Integrator tag reported to the aggregator with every quote.
    pub integrator: String,
    /// Integrator fee as a fraction (0.003 = 0.3%).
    pub fee: f64,
    pub timeout_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: AppSettings {
                name: "evm-wallet".to_string(),
                log_level: "warn".to_string(),
            },
            wallet: WalletSettings {
                path: FileWalletStore::default_path(),
            },
            aggregator: AggregatorSettings {
                base_url: "https://li.quest/v1".to_string(),
                integrator: "CyberPay".to_string(),
                fee: 0.003,
                timeout_seconds: 30,
            },
            rpc: RpcSettings::default(),
        }
    }
}

impl Settings {
    /// Defaults, then `config/default`, `config/local`, then `EVM_WALLET__*`
    /// environment variables (e.g. `EVM_WALLET__RPC__MAX_ATTEMPTS=5`).
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("EVM_WALLET")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::from(path.as_ref()))
            .build()?;

        s.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..1.0).contains(&self.aggregator.fee) {
            return Err(format!("aggregator.fee must be in [0, 1), got {}", self.aggregator.fee));
        }

        if self.aggregator.timeout_seconds == 0 {
            return Err("aggregator.timeout_seconds must be positive".to_string());
        }

        if self.aggregator.integrator.trim().is_empty() {
            return Err("aggregator.integrator must not be empty".to_string());
        }

        if !self.aggregator.base_url.starts_with("http://") && !self.aggregator.base_url.starts_with("https://") {
            return Err(format!("aggregator.base_url is not an HTTP URL: {}", self.aggregator.base_url));
        }

        self.rpc.validate()
    }
}
