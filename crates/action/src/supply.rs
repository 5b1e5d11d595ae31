//! Lending pool supply.
//!
//! Builds `supply` or `supplyWithPermit` depending on the authorization the
//! executor obtained, then submits it with a buffered node gas estimate.

use crate::{unix_now, Action, Authorization, SignedPermit, SupplyError, Wallet};
use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use alloy_sol_types::SolCall;
use binding::pool::IPool;
use config::GasConfig;
use std::sync::Arc;
use tracing::info;

/// Supply input data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Supply {
    pub pool: Address,
    pub asset: Address,
    pub amount: U256,
    /// Sender of the transaction
    pub owner: Address,
    /// Receiver of the aTokens
    pub on_behalf_of: Address,
    pub referral_code: u16,
}

pub struct SupplyAction {
    wallet: Arc<dyn Wallet>,
    gas: GasConfig,
    confirmations: u64,
    authorization: Authorization,
    action: Supply,
    completed: Option<TxHash>,
}

impl SupplyAction {
    pub fn new(
        wallet: Arc<dyn Wallet>,
        gas: GasConfig,
        confirmations: u64,
        authorization: Authorization,
        action: Supply,
    ) -> Self {
        Self {
            wallet,
            gas,
            confirmations,
            authorization,
            action,
            completed: None,
        }
    }

    fn calldata(&self) -> Bytes {
        let Supply {
            asset,
            amount,
            on_behalf_of,
            referral_code,
            ..
        } = self.action;

        match self.authorization {
            Authorization::Permit(SignedPermit {
                signature,
                deadline,
                ..
            }) => IPool::supplyWithPermitCall {
                asset,
                amount,
                onBehalfOf: on_behalf_of,
                referralCode: referral_code,
                deadline: U256::from(deadline),
                permitV: 27 + u8::from(signature.v()),
                permitR: signature.r().to_be_bytes::<32>().into(),
                permitS: signature.s().to_be_bytes::<32>().into(),
            }
            .abi_encode()
            .into(),
            Authorization::OnChainApproval(_) | Authorization::ExistingAllowance => {
                IPool::supplyCall {
                    asset,
                    amount,
                    onBehalfOf: on_behalf_of,
                    referralCode: referral_code,
                }
                .abi_encode()
                .into()
            }
        }
    }

    pub fn transaction_request(&self) -> TransactionRequest {
        TransactionRequest::default()
            .from(self.action.owner)
            .to(self.action.pool)
            .input(TransactionInput::new(self.calldata()))
    }

    /// Check the permit deadline, estimate gas, sign and broadcast.
    pub async fn submit(&self) -> Result<TxHash, SupplyError> {
        if let Authorization::Permit(permit) = &self.authorization {
            if permit.is_expired(unix_now()) {
                return Err(SupplyError::SignatureExpired {
                    deadline: permit.deadline,
                });
            }
        }

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
            pool = %self.action.pool,
            asset = %self.action.asset,
            amount = %self.action.amount,
            permit = self.authorization.is_permit(),
            "Supply submitted"
        );
        Ok(tx_hash)
    }

    /// Wait for the supply to be mined.
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
            "Supply confirmed"
        );
        Ok(receipt.into_result())
    }
}

impl Action for SupplyAction {
    async fn is_ready(&self) -> eyre::Result<bool> {
        let unexpired = match &self.authorization {
            Authorization::Permit(permit) => !permit.is_expired(unix_now()),
            _ => true,
        };
        Ok(unexpired && !self.action.amount.is_zero() && self.action.pool != Address::ZERO)
    }

    async fn is_completed(&self) -> eyre::Result<bool> {
        Ok(self.completed.is_some())
    }

    async fn execute(&mut self) -> eyre::Result<crate::Result> {
        if let Some(tx_hash) = self.completed {
            eyre::bail!("Supply already executed in {tx_hash}")
        }

        let tx_hash = self.submit().await?;
        let result = self.confirm(tx_hash).await?;
        self.completed = Some(result.tx_hash);
        Ok(result)
    }

    fn description(&self) -> String {
        let method = if self.authorization.is_permit() {
            "supplyWithPermit"
        } else {
            "supply"
        };
        format!(
            "Supplying {} of {} to {} via {}",
            self.action.amount, self.action.asset, self.action.pool, method
        )
    }
}
