//! In-memory balance book.

use crate::{normalize_symbol, BalanceSnapshot, BalanceSource};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

/// Per-symbol, per-chain balances written by whoever refreshes them
/// (a monitor loop, a unified-balance feed) and read by supply actions.
///
/// Last writer wins; readers always get a copy.
#[derive(Debug, Clone, Default)]
pub struct BalanceBook {
    snapshots: Arc<RwLock<HashMap<String, BalanceSnapshot>>>,
}

impl BalanceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the balance of `symbol` on `chain_id`.
    pub fn set(&self, symbol: &str, chain_id: u64, amount: Decimal) {
        let symbol = normalize_symbol(symbol);
        let mut snapshots = self
            .snapshots
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        snapshots
            .entry(symbol.clone())
            .or_insert_with(|| BalanceSnapshot {
                symbol,
                ..Default::default()
            })
            .balances
            .insert(chain_id, amount);
    }

    /// Replace the whole snapshot of one symbol.
    pub fn replace(&self, snapshot: BalanceSnapshot) {
        let symbol = normalize_symbol(&snapshot.symbol);
        self.snapshots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                symbol.clone(),
                BalanceSnapshot {
                    symbol,
                    balances: snapshot.balances,
                },
            );
    }

    /// Copy of the snapshot for `symbol`; empty when nothing was recorded.
    pub fn get(&self, symbol: &str) -> BalanceSnapshot {
        let symbol = normalize_symbol(symbol);
        self.snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&symbol)
            .cloned()
            .unwrap_or_else(|| BalanceSnapshot::new(&symbol))
    }
}

#[async_trait]
impl BalanceSource for BalanceBook {
    async fn snapshot(&self, symbol: &str) -> eyre::Result<BalanceSnapshot> {
        Ok(self.get(symbol))
    }
}
