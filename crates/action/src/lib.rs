//! Supply actions and their orchestration.
//!
//! Leaf actions ([`ApproveAction`], [`SupplyAction`]) each send one
//! transaction through a [`Wallet`]. The [`SupplyExecutor`] sequences them
//! with permit signing and liquidity bridging and publishes progress to the
//! [`TransactionStateStore`].

pub mod approval;
pub mod approve;
pub mod error;
pub mod executor;
pub mod gas;
pub mod state;
pub mod supply;
pub mod wallet;

use alloy_primitives::{TxHash, U256};
use std::{
    future::Future,
    time::{SystemTime, UNIX_EPOCH},
};

pub use approval::{
    ApprovalIntent, ApprovalMethod, ApprovalStrategyDecider, Authorization, SignedPermit,
};
pub use approve::{Approve, ApproveAction};
pub use error::SupplyError;
pub use executor::{CacheInvalidation, SupplyExecutor, SupplyOutcome, SupplyRequest};
pub use gas::{ActionKind, GasEstimator};
pub use state::TransactionStateStore;
pub use supply::{Supply, SupplyAction};
pub use wallet::{AlloyWallet, Receipt, Wallet, WalletError};

/// Trait for executable onchain actions.
pub trait Action: Send + Sync {
    /// Check to see if the action is ready to be executed.
    ///
    /// Returns true if all preconditions are met.
    fn is_ready(&self) -> impl Future<Output = eyre::Result<bool>> + Send;

    /// Check if the action has already been completed.
    fn is_completed(&self) -> impl Future<Output = eyre::Result<bool>> + Send;

    /// Execute the action.
    ///
    /// Returns once the transaction is confirmed.
    fn execute(&mut self) -> impl Future<Output = eyre::Result<Result>> + Send;

    /// Get a human-readable description of this action.
    fn description(&self) -> String;
}

/// Result of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Result {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Block number where transaction was included
    pub block_number: Option<u64>,
    /// Gas used
    pub gas_used: Option<U256>,
}

/// Current unix time in seconds.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}
