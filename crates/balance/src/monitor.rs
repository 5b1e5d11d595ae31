use crate::{Balance, BalanceBook, BalanceQuery, Monitor};
use alloy_primitives::{utils::format_units, Address};
use alloy_provider::Provider;
use binding::token::IERC20;
use eyre::Result;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

/// On-chain balance monitor for a single chain.
pub struct BalanceMonitor<P> {
    provider: P,
    chain_id: u64,
}

impl<P> BalanceMonitor<P>
where
    P: Provider + Clone,
{
    pub const fn new(provider: P, chain_id: u64) -> Self {
        Self { provider, chain_id }
    }

    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn query_native(&self, address: Address) -> Result<Balance> {
        debug!("Querying native balance: address={}", address);

        let balance = self.provider.get_balance(address).await?;

        Ok(Balance {
            holder: address,
            asset: Address::ZERO,
            amount: balance,
        })
    }

    async fn query_erc20(&self, token: Address, holder: Address) -> Result<Balance> {
        debug!("Querying erc20 {} balance: address={}", token, holder);

        let contract = IERC20::new(token, &self.provider);
        let amount = contract.balanceOf(holder).call().await?;

        Ok(Balance {
            holder,
            asset: token,
            amount,
        })
    }

    /// Query a balance and record it in `book` under `symbol` for this chain.
    ///
    /// Returns the balance in whole-token units.
    pub async fn refresh(
        &self,
        book: &BalanceBook,
        symbol: &str,
        query: BalanceQuery,
        decimals: u8,
    ) -> Result<Decimal> {
        let balance = self.query_balance(query).await?;
        let amount = Decimal::from_str(&format_units(balance.amount, decimals)?)?;

        debug!(
            symbol,
            chain_id = self.chain_id,
            amount = %amount,
            "Balance refreshed"
        );

        book.set(symbol, self.chain_id, amount);
        Ok(amount)
    }
}

impl<P> Monitor for BalanceMonitor<P>
where
    P: Provider + Clone,
{
    async fn query_balance(&self, query: BalanceQuery) -> Result<Balance> {
        match query {
            BalanceQuery::ERC20Balance { token, holder } => self.query_erc20(token, holder).await,
            BalanceQuery::NativeBalance { address } => self.query_native(address).await,
        }
    }
}
