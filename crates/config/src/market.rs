//! Lending market configuration.
//!
//! Provides chain-specific pool addresses and parameters for the markets the
//! orchestrator can supply into.

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// Known market deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Ethereum,
    Arbitrum,
    Base,
    Sepolia,
}

/// Lending market configuration on a single chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Network the market is deployed on
    pub network_type: NetworkType,
    /// Chain ID
    pub chain_id: u64,
    /// Pool contract address (spender of supplied assets)
    pub pool: Address,
    /// Wrapped native token address
    pub wrapped_native: Address,
}

impl MarketConfig {
    /// Ethereum mainnet market.
    pub const fn ethereum() -> Self {
        Self {
            network_type: NetworkType::Ethereum,
            chain_id: 1,
            // https://etherscan.io/address/0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2
            pool: address!("0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2"),
            wrapped_native: address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
        }
    }

    /// Arbitrum One market.
    pub const fn arbitrum() -> Self {
        Self {
            network_type: NetworkType::Arbitrum,
            chain_id: 42161,
            // https://arbiscan.io/address/0x794a61358D6845594F94dc1DB02A252b5b4814aD
            pool: address!("0x794a61358D6845594F94dc1DB02A252b5b4814aD"),
            wrapped_native: address!("0x82aF49447D8a07e3bd95BD0d56f35241523fBab1"),
        }
    }

    /// Base market.
    pub const fn base() -> Self {
        Self {
            network_type: NetworkType::Base,
            chain_id: 8453,
            // https://basescan.org/address/0xA238Dd80C259a72e81d7e4664a9801593F98d1c5
            pool: address!("0xA238Dd80C259a72e81d7e4664a9801593F98d1c5"),
            // OP Stack predeploy
            wrapped_native: address!("0x4200000000000000000000000000000000000006"),
        }
    }

    /// Ethereum Sepolia testnet market.
    pub const fn sepolia() -> Self {
        Self {
            network_type: NetworkType::Sepolia,
            chain_id: 11155111,
            // https://sepolia.etherscan.io/address/0x6Ae43d3271ff6888e7Fc43Fd7321a503ff738951
            pool: address!("0x6Ae43d3271ff6888e7Fc43Fd7321a503ff738951"),
            wrapped_native: address!("0xC558DBdd856501FCd9aaF1E62eae57A9F0629a3c"),
        }
    }

    /// Create configuration from network type.
    pub const fn from_network_type(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Ethereum => Self::ethereum(),
            NetworkType::Arbitrum => Self::arbitrum(),
            NetworkType::Base => Self::base(),
            NetworkType::Sepolia => Self::sepolia(),
        }
    }

    /// Whether `asset` is this market's wrapped native token.
    pub fn is_wrapped_native(&self, asset: Address) -> bool {
        self.wrapped_native == asset
    }
}

/// Builder for custom market configurations.
#[derive(Debug, Clone)]
pub struct MarketConfigBuilder {
    market: MarketConfig,
}

impl MarketConfigBuilder {
    /// Start from a known market.
    pub const fn new(network_type: NetworkType) -> Self {
        Self {
            market: MarketConfig::from_network_type(network_type),
        }
    }

    /// Override the pool address (forks and staging deployments).
    pub const fn pool(mut self, address: Address) -> Self {
        self.market.pool = address;
        self
    }

    /// Override the wrapped native token address.
    pub const fn wrapped_native(mut self, address: Address) -> Self {
        self.market.wrapped_native = address;
        self
    }

    /// Override the chain ID (local forks).
    pub const fn chain_id(mut self, chain_id: u64) -> Self {
        self.market.chain_id = chain_id;
        self
    }

    /// Build the market configuration.
    pub const fn build(self) -> MarketConfig {
        self.market
    }
}
