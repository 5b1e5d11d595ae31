//! Spender allowance resolution.
//!
//! This crate reads ERC20 allowances (and the token metadata a permit needs)
//! and keeps a shared, last-writer-wins cache of the most recent reads keyed
//! by `(asset, owner, spender)`.

pub mod reader;
pub mod resolver;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use reader::{Erc20Reader, TokenReader, DEFAULT_PERMIT_VERSION};
pub use resolver::{AllowanceCache, AllowanceResolver};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllowanceError {
    /// RPC or node failure after retries
    #[error("Network error: {0}")]
    Network(String),
}

/// On-chain permission for `spender` to move `owner`'s `asset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Allowance {
    pub owner: Address,
    pub spender: Address,
    pub asset: Address,
    pub amount: U256,
}

impl Allowance {
    pub const fn key(&self) -> AllowanceKey {
        AllowanceKey {
            asset: self.asset,
            owner: self.owner,
            spender: self.spender,
        }
    }

    /// Whether the allowance covers `amount`.
    pub fn covers(&self, amount: U256) -> bool {
        self.amount >= amount
    }
}

/// Cache key of an allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AllowanceKey {
    pub asset: Address,
    pub owner: Address,
    pub spender: Address,
}
