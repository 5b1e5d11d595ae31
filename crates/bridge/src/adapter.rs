//! Shortfall detection and bridge invocation.

use crate::{BridgeError, BridgeReceipt, BridgeRequest, BridgeService, BridgeToken};
use balance::{normalize_symbol, BalanceSnapshot};
use config::FeeBuffers;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

/// Covers a destination-chain shortfall by bridging from other chains.
#[derive(Clone)]
pub struct LiquidityBridgeAdapter {
    service: Arc<dyn BridgeService>,
    fee_buffers: FeeBuffers,
}

impl LiquidityBridgeAdapter {
    pub fn new(service: Arc<dyn BridgeService>, fee_buffers: FeeBuffers) -> Self {
        Self {
            service,
            fee_buffers,
        }
    }

    /// Decide whether a bridge is needed without calling the service.
    ///
    /// Returns `None` when the local balance covers `requested` or when
    /// nothing is requested. A shortfall on an asset the bridge cannot route
    /// is an error. A chain absent from the snapshot counts as a zero balance.
    pub fn plan(
        &self,
        requested: Decimal,
        symbol: &str,
        destination_chain_id: u64,
        snapshot: &BalanceSnapshot,
    ) -> Result<Option<BridgeRequest>, BridgeError> {
        if requested <= Decimal::ZERO {
            return Ok(None);
        }

        let symbol = normalize_symbol(symbol);
        if normalize_symbol(&snapshot.symbol) != symbol {
            return Err(BridgeError::SymbolMismatch {
                expected: symbol,
                found: snapshot.symbol.clone(),
            });
        }

        let local = snapshot
            .on_chain(destination_chain_id)
            .unwrap_or(Decimal::ZERO);
        if local >= requested {
            return Ok(None);
        }

        let Some(token) = BridgeToken::from_symbol(&symbol) else {
            debug!(symbol, %local, %requested, "Shortfall on an asset the bridge cannot route");
            return Err(BridgeError::Unsupported(symbol));
        };

        let amount = requested - local + self.fee_buffers.get(&symbol);

        Ok(Some(BridgeRequest {
            amount,
            token,
            destination_chain_id,
        }))
    }

    /// Bridge the shortfall if there is one, suspending until the service
    /// resolves. A receipt that does not report fulfilment is an error.
    pub async fn maybe_bridge(
        &self,
        requested: Decimal,
        symbol: &str,
        destination_chain_id: u64,
        snapshot: &BalanceSnapshot,
    ) -> Result<Option<BridgeReceipt>, BridgeError> {
        let Some(request) = self.plan(requested, symbol, destination_chain_id, snapshot)? else {
            return Ok(None);
        };

        info!(
            amount = %request.amount,
            token = %request.token,
            destination_chain_id,
            "Requesting bridge to cover shortfall"
        );

        let mut receipt = self.service.request_bridge(&request).await?;
        if !receipt.is_fulfilled() {
            return Err(BridgeError::InvalidReceipt(format!(
                "intent {} was not fulfilled",
                receipt.intent_id
            )));
        }

        info!(intent_id = %receipt.intent_id, "Bridge fulfilled");

        receipt.request = Some(request);
        Ok(Some(receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IntentStep, IntentStepKind};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingService {
        requests: Mutex<Vec<BridgeRequest>>,
        fail: Option<BridgeError>,
        fulfilled: bool,
    }

    impl RecordingService {
        fn fulfilling() -> Self {
            Self {
                fulfilled: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl BridgeService for RecordingService {
        async fn request_bridge(
            &self,
            request: &BridgeRequest,
        ) -> Result<BridgeReceipt, BridgeError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(err) = &self.fail {
                return Err(err.clone());
            }
            Ok(BridgeReceipt {
                intent_id: "7".to_string(),
                steps: vec![IntentStep {
                    kind: IntentStepKind::Fulfilled,
                    done: self.fulfilled,
                }],
                request: None,
            })
        }
    }

    fn adapter(service: Arc<RecordingService>) -> LiquidityBridgeAdapter {
        LiquidityBridgeAdapter::new(service, FeeBuffers::default())
    }

    #[tokio::test]
    async fn test_eth_shortfall_includes_fee_buffer() {
        let service = Arc::new(RecordingService::fulfilling());
        let snapshot = BalanceSnapshot::new("ETH").with_balance(8453, dec!(4));

        let receipt = adapter(service.clone())
            .maybe_bridge(dec!(10), "WETH", 8453, &snapshot)
            .await
            .unwrap()
            .unwrap();

        let request = receipt.request.unwrap();
        assert_eq!(request.amount, dec!(6.000001));
        assert_eq!(request.token, BridgeToken::Eth);
        assert_eq!(request.destination_chain_id, 8453);
        assert_eq!(service.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stablecoin_shortfall_has_no_buffer() {
        let service = Arc::new(RecordingService::fulfilling());
        let snapshot = BalanceSnapshot::new("USDT").with_balance(42161, dec!(25.5));

        let receipt = adapter(service)
            .maybe_bridge(dec!(100), "USD₮0", 42161, &snapshot)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(receipt.request.unwrap().amount, dec!(74.5));
    }

    #[tokio::test]
    async fn test_sufficient_balance_is_noop() {
        let service = Arc::new(RecordingService::fulfilling());
        let snapshot = BalanceSnapshot::new("USDC").with_balance(1, dec!(100));

        let receipt = adapter(service.clone())
            .maybe_bridge(dec!(100), "USDC", 1, &snapshot)
            .await
            .unwrap();

        assert!(receipt.is_none());
        assert!(service.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_zero_amount_never_bridges() {
        let service = Arc::new(RecordingService::fulfilling());
        let snapshot = BalanceSnapshot::new("ETH");
        let plan = adapter(service).plan(Decimal::ZERO, "ETH", 1, &snapshot).unwrap();
        assert!(plan.is_none());
    }

    #[test]
    fn test_missing_chain_counts_as_zero() {
        let service = Arc::new(RecordingService::fulfilling());
        let snapshot = BalanceSnapshot::new("USDC").with_balance(1, dec!(50));
        let plan = adapter(service)
            .plan(dec!(20), "USDC", 8453, &snapshot)
            .unwrap()
            .unwrap();
        assert_eq!(plan.amount, dec!(20));
    }

    #[test]
    fn test_unbridgeable_asset_without_shortfall_is_noop() {
        let service = Arc::new(RecordingService::fulfilling());
        let snapshot = BalanceSnapshot::new("WBTC").with_balance(1, dec!(2));
        let plan = adapter(service).plan(dec!(1), "WBTC", 1, &snapshot).unwrap();
        assert!(plan.is_none());
    }

    #[tokio::test]
    async fn test_unbridgeable_shortfall_is_rejected() {
        let service = Arc::new(RecordingService::fulfilling());
        let snapshot = BalanceSnapshot::new("WBTC").with_balance(8453, dec!(0));

        let err = adapter(service.clone())
            .maybe_bridge(dec!(0.5), "wbtc", 8453, &snapshot)
            .await
            .unwrap_err();

        assert_eq!(err, BridgeError::Unsupported("WBTC".to_string()));
        assert!(service.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_symbol_mismatch() {
        let service = Arc::new(RecordingService::fulfilling());
        let snapshot = BalanceSnapshot::new("USDC");
        let err = adapter(service)
            .plan(dec!(1), "ETH", 1, &snapshot)
            .unwrap_err();
        assert!(matches!(err, BridgeError::SymbolMismatch { .. }));
    }

    #[tokio::test]
    async fn test_service_failure_propagates() {
        let service = Arc::new(RecordingService {
            fail: Some(BridgeError::Timeout),
            ..Default::default()
        });
        let snapshot = BalanceSnapshot::new("ETH");

        let err = adapter(service)
            .maybe_bridge(dec!(1), "ETH", 1, &snapshot)
            .await
            .unwrap_err();
        assert_eq!(err, BridgeError::Timeout);
    }

    #[tokio::test]
    async fn test_unfulfilled_receipt_is_rejected() {
        let service = Arc::new(RecordingService::default());
        let snapshot = BalanceSnapshot::new("ETH");

        let err = adapter(service)
            .maybe_bridge(dec!(1), "ETH", 1, &snapshot)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidReceipt(_)));
    }
}
