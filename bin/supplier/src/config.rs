use alloy_primitives::Address;
use config::{MarketConfig, MarketConfigBuilder, NetworkType, SupplyConfig};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Top-level supplier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint url of the market chain
    pub rpc_url: String,

    /// Market preset
    pub network: NetworkType,

    /// Pool override for forks and staging deployments
    #[serde(default)]
    pub pool: Option<Address>,

    /// Chain id override for local forks
    #[serde(default)]
    pub chain_id: Option<u64>,

    /// Wrapped native token override for forks with their own deployment
    #[serde(default)]
    pub wrapped_native: Option<Address>,

    /// Supplying account; required with a remote signer
    #[serde(default)]
    pub owner_address: Option<Address>,

    /// Signer-proxy url; a local private key is used when unset
    #[serde(default)]
    pub signer_url: Option<String>,

    pub bridge: BridgeSettings,

    /// Prometheus exporter port
    #[serde(default)]
    pub metrics_port: Option<u16>,

    #[serde(default)]
    pub supply: SupplyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Base url of the bridge service
    pub url: String,

    /// Upper bound on a bridge call, settlement included
    #[serde(default = "default_bridge_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_bridge_timeout_secs() -> u64 {
    600
}

impl BridgeSettings {
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> eyre::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.supply.validate()?;
        if config.signer_url.is_some() && config.owner_address.is_none() {
            eyre::bail!("owner_address is required when signer_url is set");
        }
        Ok(config)
    }

    /// Market preset with any overrides applied.
    pub fn market(&self) -> MarketConfig {
        let mut builder = MarketConfigBuilder::new(self.network);
        if let Some(pool) = self.pool {
            builder = builder.pool(pool);
        }
        if let Some(chain_id) = self.chain_id {
            builder = builder.chain_id(chain_id);
        }
        if let Some(wrapped_native) = self.wrapped_native {
            builder = builder.wrapped_native(wrapped_native);
        }
        builder.build()
    }
}
