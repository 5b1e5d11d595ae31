//! Contract bindings for all external contracts.
//!
//! This crate consolidates the Solidity interfaces used across the project:
//! - Lending pool (supply, supplyWithPermit)
//! - ERC20 tokens and EIP-2612 permits
//!
//! All bindings are generated using alloy's `sol!` macro.

pub mod pool;
pub mod token;
