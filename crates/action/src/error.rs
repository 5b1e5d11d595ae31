use crate::wallet::WalletError;
use alloy_primitives::{TxHash, U256};
use allowance::AllowanceError;
use bridge::BridgeError;
use thiserror::Error;

/// Failure of a supply action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupplyError {
    /// Signing or approval was declined by the account holder
    #[error("User rejected the request: {0}")]
    UserRejected(String),

    /// Approval confirmed but the allowance is still short
    #[error("Allowance {current} is below the required {required}")]
    InsufficientAllowance { required: U256, current: U256 },

    /// RPC or node failure
    #[error("Network error: {0}")]
    Network(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Gas estimation failed: {0}")]
    GasEstimation(String),

    /// On-chain failure after submission
    #[error("Transaction {tx_hash} reverted: {}", .reason.as_deref().unwrap_or("no reason given"))]
    TransactionReverted {
        tx_hash: TxHash,
        reason: Option<String>,
    },

    /// Permit deadline passed before the supply was submitted
    #[error("Permit signature expired at {deadline}")]
    SignatureExpired { deadline: u64 },

    /// Same intent is already loading for this target
    #[error("A supply for this target is already in progress")]
    InProgress,

    /// A newer request for the same target replaced this one
    #[error("Supply superseded by a newer request")]
    Superseded,

    #[error("Invalid supply request: {0}")]
    InvalidRequest(String),
}

impl SupplyError {
    /// Short label used for metrics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UserRejected(_) => "user_rejected",
            Self::InsufficientAllowance { .. } => "insufficient_allowance",
            Self::Network(_) => "network",
            Self::Bridge(_) => "bridge",
            Self::GasEstimation(_) => "gas_estimation",
            Self::TransactionReverted { .. } => "reverted",
            Self::SignatureExpired { .. } => "signature_expired",
            Self::InProgress => "in_progress",
            Self::Superseded => "superseded",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }

    /// Text surfaced to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::UserRejected(_) => "You cancelled the request in your wallet.".to_string(),
            Self::InsufficientAllowance { .. } => {
                "The approved amount is still too low. Please approve again.".to_string()
            }
            Self::Network(_) => {
                "Could not reach the network. Please check your connection and try again."
                    .to_string()
            }
            Self::Bridge(BridgeError::Timeout) => {
                "Moving funds from your other chains took too long. Please try again.".to_string()
            }
            Self::Bridge(BridgeError::Unsupported(symbol)) => {
                format!("{symbol} cannot be moved from your other chains.")
            }
            Self::Bridge(_) => {
                "Could not move funds from your other chains. Please try again.".to_string()
            }
            Self::GasEstimation(_) => {
                "Could not estimate the network fee for this transaction.".to_string()
            }
            Self::TransactionReverted {
                reason: Some(reason),
                ..
            } => format!("Transaction failed: {reason}"),
            Self::TransactionReverted { reason: None, .. } => {
                "Transaction failed. Please try again later.".to_string()
            }
            Self::SignatureExpired { .. } => {
                "Your signature expired before the transaction was sent. Please sign again."
                    .to_string()
            }
            Self::InProgress => "This transaction is already in progress.".to_string(),
            Self::Superseded => "This request was replaced by a newer one.".to_string(),
            Self::InvalidRequest(reason) => reason.clone(),
        }
    }
}

impl From<AllowanceError> for SupplyError {
    fn from(err: AllowanceError) -> Self {
        match err {
            AllowanceError::Network(msg) => Self::Network(msg),
        }
    }
}

impl From<WalletError> for SupplyError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Rejected(msg) => Self::UserRejected(msg),
            WalletError::Rpc(msg) => Self::Network(msg),
            WalletError::Timeout(hash) => {
                Self::Network(format!("Timed out waiting for confirmation of {hash}"))
            }
        }
    }
}
