//! Balance views for the supply orchestrator.
//!
//! This crate provides:
//! - [`BalanceSnapshot`], the per-chain balances of one asset
//! - symbol normalization applied at the boundary ([`symbol`])
//! - [`BalanceBook`], an externally refreshed in-memory [`BalanceSource`]
//! - [`monitor::BalanceMonitor`], on-chain native and ERC20 balance queries

pub mod book;
pub mod monitor;
pub mod symbol;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, future::Future};

pub use book::BalanceBook;
pub use symbol::normalize_symbol;

/// Represents a blockchain balance at a specific point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// The address holding the balance
    pub holder: Address,
    /// The asset address (zero address for native token)
    pub asset: Address,
    /// The balance amount in base units
    pub amount: U256,
}

/// Type of balance query to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceQuery {
    /// Query ERC20 token balance for an EOA or contract
    ERC20Balance {
        /// Token contract address
        token: Address,
        /// Holder address
        holder: Address,
    },
    /// Query native ETH balance
    NativeBalance {
        /// Account address
        address: Address,
    },
}

/// Trait for monitoring balances on a blockchain.
pub trait Monitor: Send + Sync {
    /// Query a single balance.
    fn query_balance(
        &self,
        query: BalanceQuery,
    ) -> impl Future<Output = eyre::Result<Balance>> + Send;
}

/// Balances of one asset across chains, in whole-token units.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Canonical symbol
    pub symbol: String,
    /// Chain ID → balance
    pub balances: BTreeMap<u64, Decimal>,
}

impl BalanceSnapshot {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            balances: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with_balance(mut self, chain_id: u64, amount: Decimal) -> Self {
        self.balances.insert(chain_id, amount);
        self
    }

    /// Balance on `chain_id`, if the source reported one.
    pub fn on_chain(&self, chain_id: u64) -> Option<Decimal> {
        self.balances.get(&chain_id).copied()
    }

    /// Sum over every chain.
    pub fn total(&self) -> Decimal {
        self.balances.values().copied().sum()
    }
}

/// Read-only source of balance snapshots, refreshed outside the core.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Snapshot for `symbol`; the symbol is normalized by the source.
    async fn snapshot(&self, symbol: &str) -> eyre::Result<BalanceSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_snapshot_normalizes_symbol() {
        let snapshot = BalanceSnapshot::new("WETH");
        assert_eq!(snapshot.symbol, "ETH");
    }

    #[test]
    fn test_snapshot_lookup_and_total() {
        let snapshot = BalanceSnapshot::new("USDC")
            .with_balance(1, dec!(10.5))
            .with_balance(8453, dec!(4));

        assert_eq!(snapshot.on_chain(1), Some(dec!(10.5)));
        assert_eq!(snapshot.on_chain(42161), None);
        assert_eq!(snapshot.total(), dec!(14.5));
    }
}
