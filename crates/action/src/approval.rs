//! Permit vs. on-chain approval.
//!
//! The decider is pure: it looks at the requested amount, the last resolved
//! allowance and any signature the caller still holds, and says whether an
//! authorization step is needed and which kind.

use allowance::Allowance;
use alloy_primitives::{Address, Signature, TxHash, U256};
use serde::{Deserialize, Serialize};

/// How the user prefers to authorize the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalMethod {
    /// Off-chain EIP-2612 signature consumed by `supplyWithPermit`
    #[default]
    Permit,
    /// `approve` transaction before `supply`
    Approve,
}

/// A permit signed by the owner for one exact amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedPermit {
    pub signature: Signature,
    pub amount: U256,
    pub deadline: u64,
    pub asset: Address,
}

impl SignedPermit {
    pub const fn is_expired(&self, now: u64) -> bool {
        self.deadline <= now
    }

    /// Whether this signature can authorize supplying `amount` of `asset`.
    pub fn authorizes(&self, asset: Address, amount: U256, now: u64) -> bool {
        self.asset == asset && self.amount == amount && !self.is_expired(now)
    }
}

/// What the pool will rely on to pull the asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Permit(SignedPermit),
    OnChainApproval(TxHash),
    ExistingAllowance,
}

impl Authorization {
    pub const fn is_permit(&self) -> bool {
        matches!(self, Self::Permit(_))
    }
}

/// Outcome of [`ApprovalStrategyDecider::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalIntent {
    pub asset: Address,
    pub required_amount: U256,
    pub current_allowance: U256,
    /// An authorization step must run before supplying
    pub required: bool,
    /// That step is a permit signature
    pub use_permit: bool,
    /// A previous approval succeeded but no longer covers the amount
    pub clear_prior_approval: bool,
    /// The caller's signature already authorizes this exact supply
    pub reuse_signature: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ApprovalStrategyDecider {
    now: u64,
}

impl ApprovalStrategyDecider {
    /// Decider evaluating signature expiry at unix time `now`.
    pub const fn new(now: u64) -> Self {
        Self { now }
    }

    pub fn decide(
        &self,
        requested: U256,
        allowance: &Allowance,
        permit_available: bool,
        preference: ApprovalMethod,
        prior_signature: Option<&SignedPermit>,
        approval_succeeded: bool,
    ) -> ApprovalIntent {
        let signed_amount = prior_signature
            .filter(|sig| sig.authorizes(allowance.asset, requested, self.now))
            .map_or(U256::ZERO, |sig| sig.amount);

        let required = !requested.is_zero() && requested > allowance.amount.max(signed_amount);
        let reuse_signature = !required && !requested.is_zero() && !allowance.covers(requested);

        ApprovalIntent {
            asset: allowance.asset,
            required_amount: requested,
            current_allowance: allowance.amount,
            required,
            use_permit: required && permit_available && preference == ApprovalMethod::Permit,
            clear_prior_approval: required && approval_succeeded,
            reuse_signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const ASSET: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
    const NOW: u64 = 1_700_000_000;

    fn allowance(amount: u64) -> Allowance {
        Allowance {
            owner: Address::repeat_byte(1),
            spender: Address::repeat_byte(2),
            asset: ASSET,
            amount: U256::from(amount),
        }
    }

    fn signature(amount: u64, deadline: u64) -> SignedPermit {
        SignedPermit {
            signature: Signature::new(U256::from(1), U256::from(2), false),
            amount: U256::from(amount),
            deadline,
            asset: ASSET,
        }
    }

    fn decider() -> ApprovalStrategyDecider {
        ApprovalStrategyDecider::new(NOW)
    }

    #[test]
    fn test_zero_amount_never_requires_approval() {
        for permit_available in [true, false] {
            let intent = decider().decide(
                U256::ZERO,
                &allowance(0),
                permit_available,
                ApprovalMethod::Permit,
                None,
                false,
            );
            assert!(!intent.required);
            assert!(!intent.use_permit);
            assert!(!intent.reuse_signature);
        }
    }

    #[test]
    fn test_sufficient_allowance_skips_approval() {
        let intent = decider().decide(
            U256::from(50),
            &allowance(100),
            true,
            ApprovalMethod::Permit,
            None,
            false,
        );
        assert!(!intent.required);
        assert!(!intent.use_permit);
    }

    #[test]
    fn test_permit_when_available_and_preferred() {
        let intent = decider().decide(
            U256::from(100),
            &allowance(10),
            true,
            ApprovalMethod::Permit,
            None,
            false,
        );
        assert!(intent.required);
        assert!(intent.use_permit);
        assert_eq!(intent.current_allowance, U256::from(10));
    }

    #[test]
    fn test_on_chain_approval_when_permit_unavailable_or_not_preferred() {
        let unavailable = decider().decide(
            U256::from(100),
            &allowance(0),
            false,
            ApprovalMethod::Permit,
            None,
            false,
        );
        assert!(unavailable.required && !unavailable.use_permit);

        let declined = decider().decide(
            U256::from(100),
            &allowance(0),
            true,
            ApprovalMethod::Approve,
            None,
            false,
        );
        assert!(declined.required && !declined.use_permit);
    }

    #[test]
    fn test_matching_signature_is_reused() {
        let sig = signature(100, NOW + 60);
        let intent = decider().decide(
            U256::from(100),
            &allowance(0),
            true,
            ApprovalMethod::Permit,
            Some(&sig),
            false,
        );
        assert!(!intent.required);
        assert!(intent.reuse_signature);
    }

    #[test]
    fn test_signature_for_other_amount_is_ignored() {
        let sig = signature(100, NOW + 60);
        let intent = decider().decide(
            U256::from(150),
            &allowance(0),
            true,
            ApprovalMethod::Permit,
            Some(&sig),
            false,
        );
        assert!(intent.required);
        assert!(!intent.reuse_signature);
    }

    #[test]
    fn test_expired_signature_is_ignored() {
        let sig = signature(100, NOW);
        let intent = decider().decide(
            U256::from(100),
            &allowance(0),
            true,
            ApprovalMethod::Permit,
            Some(&sig),
            false,
        );
        assert!(intent.required);
        assert!(intent.use_permit);
    }

    #[test]
    fn test_stale_approval_success_is_cleared() {
        let intent = decider().decide(
            U256::from(200),
            &allowance(100),
            false,
            ApprovalMethod::Approve,
            None,
            true,
        );
        assert!(intent.required);
        assert!(intent.clear_prior_approval);

        let covered = decider().decide(
            U256::from(100),
            &allowance(100),
            false,
            ApprovalMethod::Approve,
            None,
            true,
        );
        assert!(!covered.clear_prior_approval);
    }
}
