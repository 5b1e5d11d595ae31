//! Wallet seam used by supply actions.
//!
//! [`AlloyWallet`] signs through the client crate's signer fns (local key or
//! signer-proxy) and broadcasts through an alloy provider.

use alloy_primitives::{Address, Signature, TxHash, U256};
use alloy_provider::{PendingTransactionBuilder, PendingTransactionError, Provider, WatchTxError};
use alloy_rpc_types::{BlockId, TransactionRequest};
use alloy_sol_types::decode_revert_reason;
use async_trait::async_trait;
use client::{PermitPayload, PermitSignerFn, SignerFn, UserRejected};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// The account holder declined
    #[error("Rejected by user: {0}")]
    Rejected(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    /// No receipt within the wallet's receipt timeout
    #[error("Timed out waiting for confirmation of {0}")]
    Timeout(TxHash),
}

/// Mined transaction, reduced to what supply actions need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub success: bool,
    /// Decoded revert reason of a failed transaction, when available
    pub revert_reason: Option<String>,
}

impl Receipt {
    pub fn into_result(self) -> crate::Result {
        crate::Result {
            tx_hash: self.tx_hash,
            block_number: self.block_number,
            gas_used: Some(U256::from(self.gas_used)),
        }
    }
}

/// Signs, submits and tracks transactions for one account on one chain.
#[async_trait]
pub trait Wallet: Send + Sync {
    fn address(&self) -> Address;

    fn chain_id(&self) -> u64;

    /// Node gas estimate; a revert during simulation is reported as `Rpc`.
    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, WalletError>;

    /// Sign and broadcast, returning once the node accepted the transaction.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, WalletError>;

    /// Suspend until `hash` has `confirmations` confirmations.
    async fn wait_for_receipt(
        &self,
        hash: TxHash,
        confirmations: u64,
    ) -> Result<Receipt, WalletError>;

    /// Sign an EIP-2612 permit off-chain.
    async fn sign_permit(&self, payload: PermitPayload) -> Result<Signature, WalletError>;
}

fn classify(err: eyre::Report) -> WalletError {
    if let Some(rejected) = err.downcast_ref::<UserRejected>() {
        WalletError::Rejected(rejected.0.clone())
    } else {
        WalletError::Rpc(format!("{err:#}"))
    }
}

fn receipt_error(hash: TxHash, err: PendingTransactionError) -> WalletError {
    match err {
        PendingTransactionError::TxWatcher(WatchTxError::Timeout) => WalletError::Timeout(hash),
        other => WalletError::Rpc(other.to_string()),
    }
}

/// [`Wallet`] backed by an alloy provider and the client crate's signer fns.
pub struct AlloyWallet<P> {
    provider: P,
    signer: SignerFn,
    permit_signer: PermitSignerFn,
    address: Address,
    chain_id: u64,
    receipt_timeout: Option<Duration>,
}

impl<P> AlloyWallet<P>
where
    P: Provider + Clone,
{
    pub const fn new(
        provider: P,
        signer: SignerFn,
        permit_signer: PermitSignerFn,
        address: Address,
        chain_id: u64,
    ) -> Self {
        Self {
            provider,
            signer,
            permit_signer,
            address,
            chain_id,
            receipt_timeout: None,
        }
    }

    /// Give up waiting for a receipt after `timeout`.
    pub const fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = Some(timeout);
        self
    }

    /// Replay a failed transaction at its block to recover the revert data.
    async fn replay_revert(&self, hash: TxHash, block_number: Option<u64>) -> Option<String> {
        let tx = self.provider.get_transaction_by_hash(hash).await.ok()??;
        let mut call = self.provider.call(tx.into_request());
        if let Some(block) = block_number {
            call = call.block(BlockId::number(block));
        }

        let err = call.await.err()?;
        let data = err.as_error_resp()?.as_revert_data()?;
        decode_revert_reason(&data)
    }
}

#[async_trait]
impl<P> Wallet for AlloyWallet<P>
where
    P: Provider + Clone + Send + Sync,
{
    fn address(&self) -> Address {
        self.address
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64, WalletError> {
        self.provider.estimate_gas(tx.clone()).await.map_err(|e| {
            let reason = e
                .as_error_resp()
                .and_then(|payload| payload.as_revert_data())
                .and_then(|data| decode_revert_reason(&data));
            WalletError::Rpc(reason.unwrap_or_else(|| e.to_string()))
        })
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, WalletError> {
        let signed = (self.signer)(tx).await.map_err(classify)?;
        let pending = self
            .provider
            .send_raw_transaction(&signed)
            .await
            .map_err(|e| WalletError::Rpc(e.to_string()))?;

        debug!(tx_hash = %pending.tx_hash(), "Transaction broadcast");
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(
        &self,
        hash: TxHash,
        confirmations: u64,
    ) -> Result<Receipt, WalletError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), hash)
            .with_required_confirmations(confirmations)
            .with_timeout(self.receipt_timeout)
            .get_receipt()
            .await
            .map_err(|e| receipt_error(hash, e))?;

        let success = receipt.status();
        let revert_reason = if success {
            None
        } else {
            self.replay_revert(hash, receipt.block_number).await
        };

        Ok(Receipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            success,
            revert_reason,
        })
    }

    async fn sign_permit(&self, payload: PermitPayload) -> Result<Signature, WalletError> {
        (self.permit_signer)(payload).await.map_err(classify)
    }
}
