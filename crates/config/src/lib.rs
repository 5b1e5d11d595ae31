//! Configuration types for the supply orchestrator.
//!
//! This crate provides:
//! - Lending market presets (pool and wrapped native addresses per chain)
//! - Gas limit recommendations for supply actions
//! - Bridge fee buffers and permit settings
//! - Configuration loading and validation

pub mod gas;
pub mod market;
pub mod supply;

pub use gas::GasConfig;
pub use market::{MarketConfig, MarketConfigBuilder, NetworkType};
pub use supply::{ConfigError, FeeBuffers, SupplyConfig};
