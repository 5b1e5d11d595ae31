pub mod config;
pub mod metrics;

use action::{Authorization, SupplyError, SupplyExecutor, SupplyOutcome, SupplyRequest};
use alloy_primitives::{utils::parse_units, Address, U256};
use alloy_provider::Provider;
use balance::{monitor::BalanceMonitor, BalanceBook, BalanceQuery};
use binding::token::IERC20;
use ::config::MarketConfig;
use crate::metrics::Metrics;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use std::time::Instant;
use tracing::info;

/// Display metadata of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u8,
}

pub async fn token_metadata<P>(provider: &P, asset: Address) -> eyre::Result<TokenMetadata>
where
    P: Provider,
{
    let token = IERC20::new(asset, provider);
    let symbol = token.symbol().call().await?;
    let decimals = token.decimals().call().await?;

    Ok(TokenMetadata { symbol, decimals })
}

/// Parse a whole-token amount such as `"12.5"` into base units.
pub fn parse_amount(amount: &str, decimals: u8) -> eyre::Result<U256> {
    if amount.trim_start().starts_with('-') {
        eyre::bail!("Amount must not be negative: {amount}");
    }
    Ok(parse_units(amount, decimals)?.get_absolute())
}

/// Refresh the owner's market-chain balance of `asset` into `book`.
///
/// The wrapped native token is tracked as the native balance, since that is
/// what the bridge delivers.
pub async fn refresh_balance<P>(
    monitor: &BalanceMonitor<P>,
    book: &BalanceBook,
    market: &MarketConfig,
    asset: Address,
    owner: Address,
    token: &TokenMetadata,
) -> eyre::Result<Decimal>
where
    P: Provider + Clone,
{
    let query = if market.is_wrapped_native(asset) {
        BalanceQuery::NativeBalance { address: owner }
    } else {
        BalanceQuery::ERC20Balance {
            token: asset,
            holder: owner,
        }
    };

    monitor
        .refresh(book, &token.symbol, query, token.decimals)
        .await
}

/// Run a supply and record its metrics.
pub async fn run_supply(
    executor: &SupplyExecutor,
    metrics: &Metrics,
    request: SupplyRequest,
) -> Result<SupplyOutcome, SupplyError> {
    let started = Instant::now();

    match executor.supply(request).await {
        Ok(outcome) => {
            let method = match outcome.authorization {
                Authorization::Permit(_) => "permit",
                Authorization::OnChainApproval(_) => "approval",
                Authorization::ExistingAllowance => "allowance",
            };
            metrics.record_supply(
                method,
                matches!(outcome.authorization, Authorization::OnChainApproval(_)),
                outcome.bridge.is_some(),
                started.elapsed(),
            );
            info!(
                tx_hash = %outcome.tx_hash,
                method,
                bridged = outcome.bridge.is_some(),
                "Supplied {}",
                outcome.amount
            );
            Ok(outcome)
        }
        Err(err) => {
            metrics.record_failure(err.kind(), started.elapsed());
            Err(err)
        }
    }
}

/// Publish a refreshed balance to the metrics gauge.
pub fn report_balance(metrics: &Metrics, symbol: &str, amount: Decimal) {
    metrics.set_balance(
        &balance::normalize_symbol(symbol),
        amount.to_f64().unwrap_or_default(),
    );
}
