//! Supply orchestration settings.

use crate::GasConfig;
use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Extra amount added to a bridge shortfall, keyed by canonical symbol.
///
/// Covers dust lost to the gas token while bridging. Symbols without an entry
/// get no buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeBuffers(HashMap<String, Decimal>);

impl FeeBuffers {
    pub fn new(entries: impl IntoIterator<Item = (String, Decimal)>) -> Self {
        Self(entries.into_iter().collect())
    }

    /// Buffer for a canonical symbol, zero when none is configured.
    pub fn get(&self, symbol: &str) -> Decimal {
        self.0.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some((symbol, _)) = self.0.iter().find(|(_, buffer)| buffer.is_sign_negative()) {
            return Err(ConfigError::Invalid(format!(
                "fee buffer for {symbol} is negative"
            )));
        }
        Ok(())
    }
}

impl Default for FeeBuffers {
    fn default() -> Self {
        // 0.000001 ETH
        Self::new([("ETH".to_string(), Decimal::new(1, 6))])
    }
}

/// Settings shared by every supply action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplyConfig {
    /// Gas limit recommendations
    pub gas: GasConfig,
    /// Bridge shortfall buffers
    pub fee_buffers: FeeBuffers,
    /// Assets whose token contract supports EIP-2612 permits
    pub permit_assets: Vec<Address>,
    /// Lifetime of a signed permit
    pub permit_ttl_secs: u64,
    /// Confirmations awaited for approval and supply transactions
    pub confirmations: u64,
    /// Upper bound on waiting for a transaction's confirmations
    pub confirmation_timeout_secs: u64,
    /// On-chain approvals attempted before giving up on a short allowance
    pub max_approval_rounds: u32,
    /// Referral code passed to the pool
    pub referral_code: u16,
}

impl SupplyConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.confirmations == 0 {
            return Err(ConfigError::Invalid("confirmations must be at least 1".into()));
        }
        if self.max_approval_rounds == 0 {
            return Err(ConfigError::Invalid(
                "max_approval_rounds must be at least 1".into(),
            ));
        }
        if self.confirmation_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "confirmation_timeout_secs must be positive".into(),
            ));
        }
        if self.permit_ttl_secs == 0 {
            return Err(ConfigError::Invalid("permit_ttl_secs must be positive".into()));
        }
        self.fee_buffers.validate()
    }

    pub const fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    /// Whether the asset's token contract accepts permits.
    pub fn permit_enabled(&self, asset: Address) -> bool {
        self.permit_assets.contains(&asset)
    }
}

impl Default for SupplyConfig {
    fn default() -> Self {
        Self {
            gas: GasConfig::default(),
            fee_buffers: FeeBuffers::default(),
            permit_assets: Vec::new(),
            permit_ttl_secs: 3_600,
            confirmations: 1,
            confirmation_timeout_secs: 300,
            max_approval_rounds: 3,
            referral_code: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_fee_buffers() {
        let buffers = FeeBuffers::default();
        assert_eq!(buffers.get("ETH"), dec!(0.000001));
        assert_eq!(buffers.get("USDC"), Decimal::ZERO);
    }

    #[test]
    fn test_from_toml_str() {
        let config = SupplyConfig::from_toml_str(
            r#"
            permit_assets = ["0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"]
            max_approval_rounds = 2

            [fee_buffers]
            ETH = "0.00002"
            USDT = "0.01"

            [gas]
            supply = 250000
            "#,
        )
        .unwrap();

        assert_eq!(config.max_approval_rounds, 2);
        assert_eq!(config.fee_buffers.get("ETH"), dec!(0.00002));
        assert_eq!(config.fee_buffers.get("USDT"), dec!(0.01));
        assert_eq!(config.gas.supply, 250_000);
        assert_eq!(config.gas.supply_with_permit, 350_000);
        assert!(config.permit_enabled(address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")));
        assert_eq!(config.confirmations, 1);
    }

    #[test]
    fn test_confirmation_timeout() {
        assert_eq!(
            SupplyConfig::default().confirmation_timeout(),
            Duration::from_secs(300)
        );
        let config = SupplyConfig::from_toml_str("confirmation_timeout_secs = 45").unwrap();
        assert_eq!(config.confirmation_timeout(), Duration::from_secs(45));
        assert!(SupplyConfig::from_toml_str("confirmation_timeout_secs = 0").is_err());
    }

    #[test]
    fn test_rejects_zero_confirmations() {
        let result = SupplyConfig::from_toml_str("confirmations = 0");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_negative_buffer() {
        let result = SupplyConfig::from_toml_str("[fee_buffers]\nETH = \"-1\"");
        assert!(result.unwrap_err().to_string().contains("ETH"));
    }
}
