//! Lending pool contract bindings.
//!
//! Only the deposit entry points are bound:
//! - `supply` pulls the asset through an existing allowance
//! - `supplyWithPermit` consumes an EIP-2612 signature in the same call

use alloy_sol_types::sol;

sol! {
    /// Pool - Main user-facing contract of the lending market
    #[sol(rpc)]
    #[allow(clippy::too_many_arguments)]
    interface IPool {
        /// Emitted on supply()
        event Supply(
            address indexed reserve,
            address user,
            address indexed onBehalfOf,
            uint256 amount,
            uint16 indexed referralCode
        );

        /// Supply `amount` of `asset`, minting aTokens to `onBehalfOf`
        function supply(
            address asset,
            uint256 amount,
            address onBehalfOf,
            uint16 referralCode
        ) external;

        /// Supply with a permit signature instead of a prior approval
        function supplyWithPermit(
            address asset,
            uint256 amount,
            address onBehalfOf,
            uint16 referralCode,
            uint256 deadline,
            uint8 permitV,
            bytes32 permitR,
            bytes32 permitS
        ) external;
    }
}
