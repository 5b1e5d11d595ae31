//! ERC20 approval of the pool.

use crate::{Action, SupplyError, Wallet};
use allowance::TokenReader;
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use alloy_sol_types::SolCall;
use binding::token::IERC20;
use config::GasConfig;
use std::sync::Arc;
use tracing::info;

/// Approval input data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Approve {
    pub asset: Address,
    pub owner: Address,
    /// Pool allowed to pull the asset
    pub spender: Address,
    pub amount: U256,
}

/// Sends `approve(spender, amount)` and waits for it to be mined.
pub struct ApproveAction {
    wallet: Arc<dyn Wallet>,
    reader: Arc<dyn TokenReader>,
    gas: GasConfig,
    confirmations: u64,
    action: Approve,
}

impl ApproveAction {
    pub fn new(
        wallet: Arc<dyn Wallet>,
        reader: Arc<dyn TokenReader>,
        gas: GasConfig,
        confirmations: u64,
        action: Approve,
    ) -> Self {
        Self {
            wallet,
            reader,
            gas,
            confirmations,
            action,
        }
    }

    pub fn transaction_request(&self) -> TransactionRequest {
        let call = IERC20::approveCall {
            spender: self.action.spender,
            amount: self.action.amount,
        };
        TransactionRequest::default()
            .from(self.action.owner)
            .to(self.action.asset)
            .input(TransactionInput::new(Bytes::from(call.abi_encode())))
    }

    /// Estimate, sign and broadcast the approval.
    pub async fn submit(&self) -> Result<TxHash, SupplyError> {
        let mut tx = self.transaction_request();
        let estimate = self
            .wallet
            .estimate_gas(&tx)
            .await
            .map_err(|e| SupplyError::GasEstimation(e.to_string()))?;
        tx.gas = Some(self.gas.buffered(estimate));

        let tx_hash = self.wallet.send_transaction(tx).await?;
        info!(
            tx_hash = %tx_hash,
            asset = %self.action.asset,
            spender = %self.action.spender,
            amount = %self.action.amount,
            "Approval submitted"
        );
        Ok(tx_hash)
    }

    /// Wait for the approval to be mined.
    pub async fn confirm(&self, tx_hash: TxHash) -> Result<crate::Result, SupplyError> {
        let receipt = self
            .wallet
            .wait_for_receipt(tx_hash, self.confirmations)
            .await?;

        if !receipt.success {
            return Err(SupplyError::TransactionReverted {
                tx_hash,
                reason: receipt.revert_reason,
            });
        }

        info!(
            tx_hash = %receipt.tx_hash,
            block_number = receipt.block_number,
            gas_used = receipt.gas_used,
            "Approval confirmed"
        );
        Ok(receipt.into_result())
    }
}

impl Action for ApproveAction {
    async fn is_ready(&self) -> eyre::Result<bool> {
        Ok(!self.action.amount.is_zero() && self.action.owner == self.wallet.address())
    }

    async fn is_completed(&self) -> eyre::Result<bool> {
        let current = self
            .reader
            .allowance(self.action.asset, self.action.owner, self.action.spender)
            .await?;
        Ok(current >= self.action.amount)
    }

    async fn execute(&mut self) -> eyre::Result<crate::Result> {
        if self.is_completed().await? {
            eyre::bail!("Allowance already covers {}", self.action.amount)
        }

        let tx_hash = self.submit().await?;
        Ok(self.confirm(tx_hash).await?)
    }

    fn description(&self) -> String {
        format!(
            "Approving {} of {} for {}",
            self.action.amount, self.action.asset, self.action.spender
        )
    }
}
