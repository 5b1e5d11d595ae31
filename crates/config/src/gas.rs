//! Gas limit recommendations.

use serde::{Deserialize, Serialize};

/// Recommended gas limits for supply actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    /// Recommended limit for `supply`
    pub supply: u64,
    /// Recommended limit for `supplyWithPermit`
    pub supply_with_permit: u64,
    /// Added to `supply` while an on-chain approval is still pending
    pub approval_surcharge: u64,
    /// Percentage added on top of the node's estimate when submitting
    pub buffer_percent: u64,
}

impl GasConfig {
    pub const fn new() -> Self {
        Self {
            supply: 300_000,
            supply_with_permit: 350_000,
            approval_surcharge: 65_000,
            buffer_percent: 20,
        }
    }

    /// Apply the submission buffer to a node estimate.
    pub const fn buffered(&self, estimate: u64) -> u64 {
        estimate.saturating_add(estimate.saturating_mul(self.buffer_percent) / 100)
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self::new()
    }
}
