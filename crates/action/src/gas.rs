use config::GasConfig;

/// Transaction a gas recommendation is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Supply,
    Approve,
}

/// Recommended gas limits derived from the current approval intent.
#[derive(Debug, Clone, Copy)]
pub struct GasEstimator {
    gas: GasConfig,
}

impl GasEstimator {
    pub const fn new(gas: GasConfig) -> Self {
        Self { gas }
    }

    /// Recommended limit for `kind`.
    ///
    /// A pending on-chain approval adds the approval cost to `supply`; a
    /// permit switches to the `supplyWithPermit` limit with no surcharge.
    pub const fn estimate(
        &self,
        kind: ActionKind,
        approval_required: bool,
        use_permit: bool,
        approval_succeeded: bool,
    ) -> u64 {
        match kind {
            ActionKind::Approve => self.gas.approval_surcharge,
            ActionKind::Supply if use_permit => self.gas.supply_with_permit,
            ActionKind::Supply if approval_required && !approval_succeeded => {
                self.gas.supply.saturating_add(self.gas.approval_surcharge)
            }
            ActionKind::Supply => self.gas.supply,
        }
    }
}
