//! Cross-chain liquidity for supply actions.
//!
//! When the wallet's balance on the market chain cannot cover a supply, the
//! [`LiquidityBridgeAdapter`] asks an external bridge service to move the
//! shortfall from the user's other chains. The service's routing and
//! settlement are opaque; this crate only builds the request, waits for the
//! receipt and checks that the intent was fulfilled.

pub mod adapter;
pub mod http;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use adapter::LiquidityBridgeAdapter;
pub use http::HttpBridgeService;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The service refused the request
    #[error("Bridge rejected: {0}")]
    Rejected(String),

    /// The call did not resolve within the client timeout
    #[error("Bridge request timed out")]
    Timeout,

    /// The service answered but the receipt cannot be used
    #[error("Unusable bridge receipt: {0}")]
    InvalidReceipt(String),

    /// Snapshot handed to the adapter belongs to another asset
    #[error("Balance snapshot is for {found}, expected {expected}")]
    SymbolMismatch { expected: String, found: String },

    #[error("Bridge transport error: {0}")]
    Transport(String),

    /// Shortfall on an asset the bridge cannot route
    #[error("Bridge does not support {0}")]
    Unsupported(String),
}

/// Tokens the bridge service can route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BridgeToken {
    #[serde(rename = "ETH")]
    Eth,
    #[serde(rename = "USDC")]
    Usdc,
    #[serde(rename = "USDT")]
    Usdt,
}

impl BridgeToken {
    /// Token for a canonical symbol, if the bridge supports it.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            balance::symbol::ETH => Some(Self::Eth),
            balance::symbol::USDC => Some(Self::Usdc),
            balance::symbol::USDT => Some(Self::Usdt),
            _ => None,
        }
    }

    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Eth => balance::symbol::ETH,
            Self::Usdc => balance::symbol::USDC,
            Self::Usdt => balance::symbol::USDT,
        }
    }
}

impl fmt::Display for BridgeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Transfer of `amount` of `token` onto `destination_chain_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeRequest {
    /// Whole-token amount, serialized as a decimal string
    pub amount: Decimal,
    pub token: BridgeToken,
    pub destination_chain_id: u64,
}

/// Progress stage of a bridge intent, as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentStepKind {
    #[serde(rename = "INTENT_SUBMITTED")]
    Submitted,
    #[serde(rename = "INTENT_DEPOSITS_CONFIRMED")]
    DepositsConfirmed,
    #[serde(rename = "INTENT_COLLECTION_COMPLETE")]
    CollectionComplete,
    #[serde(rename = "INTENT_FULFILLED")]
    Fulfilled,
    #[serde(rename = "MANUAL_STEP_1")]
    UserApproval,
    #[serde(rename = "MANUAL_STEP_2")]
    Mining,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentStep {
    #[serde(rename = "type")]
    pub kind: IntentStepKind,
    pub done: bool,
}

impl IntentStep {
    /// Text shown to the user for this step.
    pub const fn label(&self) -> &'static str {
        match (self.kind, self.done) {
            (IntentStepKind::Submitted, true) => "Intent Verified",
            (IntentStepKind::Submitted, false) => "Verifying Intent",
            (IntentStepKind::DepositsConfirmed, true) => "Deposited on Source Chains",
            (IntentStepKind::DepositsConfirmed, false) => "Depositing on Source Chains",
            (IntentStepKind::CollectionComplete, true) => "Collected on Source Chains",
            (IntentStepKind::CollectionComplete, false) => "Collecting on Source Chains",
            (IntentStepKind::Fulfilled, true) => "Intent Fulfilled",
            (IntentStepKind::Fulfilled, false) => "Fulfilling Intent",
            (IntentStepKind::UserApproval, true) => "User Approved Transaction",
            (IntentStepKind::UserApproval, false) => "Pending Transaction Approval from User",
            (IntentStepKind::Mining, true) => "Transaction Successful",
            (IntentStepKind::Mining, false) => "Mining Transaction",
            (IntentStepKind::Unknown, _) => "Unknown status. Please contact support.",
        }
    }
}

/// Result of a resolved bridge call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeReceipt {
    pub intent_id: String,
    #[serde(default)]
    pub steps: Vec<IntentStep>,
    /// Request that produced this receipt, filled in by the adapter
    #[serde(skip)]
    pub request: Option<BridgeRequest>,
}

impl BridgeReceipt {
    /// Whether the service reported the intent as fulfilled.
    pub fn is_fulfilled(&self) -> bool {
        self.steps
            .iter()
            .any(|step| step.kind == IntentStepKind::Fulfilled && step.done)
    }
}

/// Remote service moving liquidity between chains.
#[async_trait]
pub trait BridgeService: Send + Sync {
    /// Request a transfer and resolve once the service settles it.
    async fn request_bridge(&self, request: &BridgeRequest) -> Result<BridgeReceipt, BridgeError>;
}
