//! Token reads backing allowance resolution and permit construction.

use crate::AllowanceError;
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use async_trait::async_trait;
use binding::token::IERC20;
use std::future::Future;
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::{debug, warn};

/// Read-only view of ERC20 token state.
#[async_trait]
pub trait TokenReader: Send + Sync {
    /// Current allowance granted by `owner` to `spender`.
    async fn allowance(
        &self,
        asset: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, AllowanceError>;

    /// EIP-2612 nonce of `owner`.
    async fn permit_nonce(&self, asset: Address, owner: Address) -> Result<U256, AllowanceError>;

    /// Token name used in the permit domain.
    async fn name(&self, asset: Address) -> Result<String, AllowanceError>;

    /// EIP-712 domain version used in the permit domain.
    async fn permit_version(&self, _asset: Address) -> Result<String, AllowanceError> {
        Ok(DEFAULT_PERMIT_VERSION.to_string())
    }
}

/// Domain version assumed for tokens that do not expose `version()`.
pub const DEFAULT_PERMIT_VERSION: &str = "1";

/// Resolves a `version()` read, falling back to [`DEFAULT_PERMIT_VERSION`]
/// when the token does not implement it. Transport failures still surface.
fn version_or_default(
    asset: Address,
    read: Result<String, alloy_contract::Error>,
) -> Result<String, AllowanceError> {
    match read {
        Ok(version) => Ok(version),
        Err(alloy_contract::Error::TransportError(e)) if e.as_error_resp().is_none() => {
            Err(AllowanceError::Network(format!("version of {asset}: {e}")))
        }
        Err(e) => {
            debug!(%asset, error = %e, "Token has no version(), using default");
            Ok(DEFAULT_PERMIT_VERSION.to_string())
        }
    }
}

/// ERC20 reader over an alloy provider.
///
/// Reads are retried with exponential backoff before surfacing a
/// [`AllowanceError::Network`].
pub struct Erc20Reader<P> {
    provider: P,
}

impl<P> Erc20Reader<P>
where
    P: Provider + Clone,
{
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }

    async fn with_retry<T, F, Fut>(
        &self,
        what: &'static str,
        asset: Address,
        f: F,
    ) -> Result<T, AllowanceError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, alloy_contract::Error>>,
    {
        let retry_strategy = ExponentialBackoff::from_millis(100).take(5);

        Retry::spawn(retry_strategy, || async {
            f().await.map_err(|e| {
                warn!(
                    asset = %asset,
                    error = %e,
                    "Token {what} read failed, will retry"
                );
                e
            })
        })
        .await
        .map_err(|e| AllowanceError::Network(format!("{what} of {asset}: {e}")))
    }
}

#[async_trait]
impl<P> TokenReader for Erc20Reader<P>
where
    P: Provider + Clone + Send + Sync,
{
    async fn allowance(
        &self,
        asset: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, AllowanceError> {
        debug!(%asset, %owner, %spender, "Querying allowance");

        let contract = IERC20::new(asset, &self.provider);
        self.with_retry("allowance", asset, || async {
            contract.allowance(owner, spender).call().await
        })
        .await
    }

    async fn permit_nonce(&self, asset: Address, owner: Address) -> Result<U256, AllowanceError> {
        let contract = IERC20::new(asset, &self.provider);
        self.with_retry("nonce", asset, || async { contract.nonces(owner).call().await })
            .await
    }

    async fn name(&self, asset: Address) -> Result<String, AllowanceError> {
        let contract = IERC20::new(asset, &self.provider);
        self.with_retry("name", asset, || async { contract.name().call().await })
            .await
    }

    async fn permit_version(&self, asset: Address) -> Result<String, AllowanceError> {
        let contract = IERC20::new(asset, &self.provider);
        version_or_default(asset, contract.version().call().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_read_or_default() {
        let asset = Address::repeat_byte(0x11);

        assert_eq!(
            version_or_default(asset, Ok("2".to_string())).unwrap(),
            "2"
        );

        let missing = alloy_contract::Error::UnknownFunction("version".to_string());
        assert_eq!(
            version_or_default(asset, Err(missing)).unwrap(),
            DEFAULT_PERMIT_VERSION
        );
    }
}
