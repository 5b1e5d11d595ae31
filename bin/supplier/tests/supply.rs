//! Supply flows driven end to end against in-memory collaborators.
//!
//! Run with:
//! ```bash
//! cargo test --package supplier --test supply
//! ```

use action::{
    state::{TransactionAction, TxStatus},
    ApprovalMethod, Authorization, SignedPermit, SupplyError,
};
use alloy_primitives::{address, Signature, U256};
use bridge::{BridgeError, BridgeToken};
use mocks::{
    eth, request, usdc, usdc_request, weth_request, CallKind, HarnessBuilder, MockBridge, BASE_CHAIN_ID,
    NODE_GAS_ESTIMATE, OWNER, USDC, WETH,
};
use rust_decimal_macros::dec;
use std::time::{SystemTime, UNIX_EPOCH};

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[tokio::test]
async fn test_approves_on_chain_when_permit_unavailable() {
    let harness = HarnessBuilder::new()
        .balance("USDC", BASE_CHAIN_ID, dec!(500))
        .build();

    let mut request = usdc_request(usdc(100));
    request.preference = ApprovalMethod::Permit;
    let outcome = harness.executor.supply(request).await.unwrap();

    assert_eq!(
        harness.wallet.sent_kinds(),
        vec![CallKind::Approve, CallKind::Supply]
    );
    let approval_hash = match outcome.authorization {
        Authorization::OnChainApproval(hash) => hash,
        other => panic!("expected an on-chain approval, got {other:?}"),
    };

    let state = harness
        .executor
        .store()
        .get(&harness.executor.key(USDC))
        .unwrap();
    assert_eq!(state.approval.status, TxStatus::Success);
    assert_eq!(state.approval.hash, Some(approval_hash));
    assert_eq!(state.main.status, TxStatus::Success);
    assert_eq!(state.main.hash, Some(outcome.tx_hash));
    assert!(state.error.is_none());
    assert!(!state.is_loading());

    // Allowance was refetched after the approval confirmed
    let cached = harness
        .cache
        .get(&allowance::AllowanceKey {
            asset: USDC,
            owner: OWNER,
            spender: harness.executor.market().pool,
        })
        .unwrap();
    assert_eq!(cached.amount, usdc(100));
}

#[tokio::test]
async fn test_existing_allowance_skips_approval() {
    let harness = HarnessBuilder::new()
        .allowance(USDC, usdc(100))
        .balance("USDC", BASE_CHAIN_ID, dec!(500))
        .build();

    let outcome = harness.executor.supply(usdc_request(usdc(50))).await.unwrap();

    assert_eq!(outcome.authorization, Authorization::ExistingAllowance);
    assert_eq!(harness.wallet.sent_kinds(), vec![CallKind::Supply]);
    assert!(harness.bridge.requests().is_empty());

    let state = harness
        .executor
        .store()
        .get(&harness.executor.key(USDC))
        .unwrap();
    assert_eq!(state.approval.status, TxStatus::Idle);
    assert_eq!(state.main.status, TxStatus::Success);
    assert_eq!(state.gas_limit, 300_000);
}

#[tokio::test]
async fn test_bridges_native_shortfall_with_fee_buffer() {
    let harness = HarnessBuilder::new()
        .allowance(WETH, eth(100))
        .balance("ETH", BASE_CHAIN_ID, dec!(4))
        .balance("ETH", 1, dec!(20))
        .build();

    let outcome = harness.executor.supply(weth_request(eth(10))).await.unwrap();

    let requests = harness.bridge.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, dec!(6.000001));
    assert_eq!(requests[0].token, BridgeToken::Eth);
    assert_eq!(requests[0].destination_chain_id, BASE_CHAIN_ID);

    let receipt = outcome.bridge.unwrap();
    assert!(receipt.is_fulfilled());
    assert_eq!(receipt.request, Some(requests[0].clone()));
    assert_eq!(harness.wallet.sent_kinds(), vec![CallKind::Supply]);
}

#[tokio::test]
async fn test_rejected_permit_never_starts_supply() {
    let harness = HarnessBuilder::new()
        .permit_asset(USDC)
        .balance("USDC", BASE_CHAIN_ID, dec!(500))
        .wallet(|wallet| wallet.rejecting_permits())
        .build();

    let err = harness
        .executor
        .supply(usdc_request(usdc(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, SupplyError::UserRejected(_)));

    let state = harness
        .executor
        .store()
        .get(&harness.executor.key(USDC))
        .unwrap();
    assert_eq!(state.main.status, TxStatus::Idle);
    assert_eq!(state.approval.status, TxStatus::Error);
    assert_eq!(
        state.approval.error.as_deref(),
        Some(err.user_message().as_str())
    );
    assert_eq!(state.error, Some(err));
    assert!(harness.wallet.sent().is_empty());
}

#[tokio::test]
async fn test_permit_supply_uses_signature() {
    let harness = HarnessBuilder::new()
        .permit_asset(USDC)
        .balance("USDC", BASE_CHAIN_ID, dec!(500))
        .build();

    let outcome = harness.executor.supply(usdc_request(usdc(25))).await.unwrap();

    let permits = harness.wallet.permits();
    assert_eq!(permits.len(), 1);
    assert_eq!(permits[0].owner, OWNER);
    assert_eq!(permits[0].spender, harness.executor.market().pool);
    assert_eq!(permits[0].value, usdc(25));
    assert_eq!(permits[0].chain_id, BASE_CHAIN_ID);
    assert_eq!(permits[0].version, "1");
    assert!(permits[0].deadline > now());

    match outcome.authorization {
        Authorization::Permit(permit) => {
            assert_eq!(permit.amount, usdc(25));
            assert_eq!(permit.deadline, permits[0].deadline);
        }
        other => panic!("expected a permit, got {other:?}"),
    }
    assert_eq!(harness.wallet.sent_kinds(), vec![CallKind::SupplyWithPermit]);

    let state = harness
        .executor
        .store()
        .get(&harness.executor.key(USDC))
        .unwrap();
    assert_eq!(state.approval.status, TxStatus::Success);
    assert_eq!(state.approval.hash, None);
    assert_eq!(state.gas_limit, 350_000);
    assert_eq!(
        harness.executor.store().history()[0].action,
        TransactionAction::SupplyWithPermit
    );
}

#[tokio::test]
async fn test_approve_preference_skips_permit() {
    let harness = HarnessBuilder::new()
        .permit_asset(USDC)
        .balance("USDC", BASE_CHAIN_ID, dec!(500))
        .build();

    let mut request = usdc_request(usdc(25));
    request.preference = ApprovalMethod::Approve;
    harness.executor.supply(request).await.unwrap();

    assert!(harness.wallet.permits().is_empty());
    assert_eq!(
        harness.wallet.sent_kinds(),
        vec![CallKind::Approve, CallKind::Supply]
    );
}

#[tokio::test]
async fn test_wrapped_native_never_uses_permit() {
    let harness = HarnessBuilder::new()
        .permit_asset(WETH)
        .balance("ETH", BASE_CHAIN_ID, dec!(5))
        .build();

    let outcome = harness.executor.supply(weth_request(eth(1))).await.unwrap();

    assert!(harness.wallet.permits().is_empty());
    assert!(matches!(
        outcome.authorization,
        Authorization::OnChainApproval(_)
    ));
    assert_eq!(
        harness.wallet.sent_kinds(),
        vec![CallKind::Approve, CallKind::Supply]
    );
}

#[tokio::test]
async fn test_reapproves_while_allowance_stays_short() {
    let builder = HarnessBuilder::new().balance("USDC", BASE_CHAIN_ID, dec!(500));
    builder.token().grant_sequence([usdc(10)]);
    let harness = builder.build();

    harness.executor.supply(usdc_request(usdc(40))).await.unwrap();

    assert_eq!(
        harness.wallet.sent_kinds(),
        vec![CallKind::Approve, CallKind::Approve, CallKind::Supply]
    );
}

#[tokio::test]
async fn test_gives_up_after_max_approval_rounds() {
    let builder = HarnessBuilder::new()
        .balance("USDC", BASE_CHAIN_ID, dec!(500))
        .config(|config| config.max_approval_rounds = 2);
    builder.token().freeze();
    let harness = builder.build();

    let err = harness
        .executor
        .supply(usdc_request(usdc(40)))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SupplyError::InsufficientAllowance {
            required: usdc(40),
            current: U256::ZERO,
        }
    );
    assert_eq!(
        harness.wallet.sent_kinds(),
        vec![CallKind::Approve, CallKind::Approve]
    );

    let state = harness
        .executor
        .store()
        .get(&harness.executor.key(USDC))
        .unwrap();
    assert_eq!(state.main.status, TxStatus::Idle);
    assert_eq!(state.error, Some(err));
}

#[tokio::test]
async fn test_bridge_failure_stops_before_supply() {
    let harness = HarnessBuilder::new()
        .allowance(USDC, usdc(100))
        .balance("USDC", BASE_CHAIN_ID, dec!(1))
        .bridge(MockBridge::failing(BridgeError::Rejected(
            "no route".to_string(),
        )))
        .build();

    let err = harness
        .executor
        .supply(usdc_request(usdc(50)))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SupplyError::Bridge(BridgeError::Rejected("no route".to_string()))
    );
    assert_eq!(harness.bridge.requests()[0].amount, dec!(49));
    assert!(harness.wallet.sent().is_empty());

    let state = harness
        .executor
        .store()
        .get(&harness.executor.key(USDC))
        .unwrap();
    assert_eq!(state.main.status, TxStatus::Error);
    assert!(harness.executor.store().history().is_empty());
}

#[tokio::test]
async fn test_unroutable_shortfall_stops_before_supply() {
    let wbtc = address!("0x0555E30da8f98308EdB960aa94C0Db47230d2B9c");
    let harness = HarnessBuilder::new()
        .allowance(wbtc, U256::from(100_000_000u64))
        .balance("WBTC", BASE_CHAIN_ID, dec!(0))
        .build();

    let err = harness
        .executor
        .supply(request(wbtc, "WBTC", 8, U256::from(50_000_000u64)))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SupplyError::Bridge(BridgeError::Unsupported("WBTC".to_string()))
    );
    assert!(harness.bridge.requests().is_empty());
    assert!(harness.wallet.sent().is_empty());
}

#[tokio::test]
async fn test_revert_reason_is_surfaced() {
    let harness = HarnessBuilder::new()
        .allowance(USDC, usdc(100))
        .balance("USDC", BASE_CHAIN_ID, dec!(500))
        .wallet(|wallet| wallet.reverting_supply("51"))
        .build();

    let err = harness
        .executor
        .supply(usdc_request(usdc(50)))
        .await
        .unwrap_err();

    let SupplyError::TransactionReverted { tx_hash, reason } = &err else {
        panic!("expected a revert, got {err:?}");
    };
    assert_eq!(reason.as_deref(), Some("51"));
    assert_eq!(err.user_message(), "Transaction failed: 51");

    let state = harness
        .executor
        .store()
        .get(&harness.executor.key(USDC))
        .unwrap();
    assert_eq!(state.main.status, TxStatus::Error);
    assert_eq!(state.main.hash, Some(*tx_hash));
    assert!(harness.invalidations.is_empty());
}

#[tokio::test]
async fn test_confirmed_supply_invalidates_caches_and_records_history() {
    let mut harness = HarnessBuilder::new()
        .allowance(USDC, usdc(100))
        .balance("USDC", BASE_CHAIN_ID, dec!(500))
        .build();

    let outcome = harness.executor.supply(usdc_request(usdc(50))).await.unwrap();

    let signal = harness.invalidations.try_recv().unwrap();
    assert_eq!(signal.key, harness.executor.key(USDC));
    assert_eq!(signal.symbol, "USDC");
    assert_eq!(signal.tx_hash, outcome.tx_hash);
    assert!(harness.invalidations.try_recv().is_err());

    let history = harness.executor.store().history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, TransactionAction::Supply);
    assert_eq!(history[0].amount, usdc(50));
    assert_eq!(history[0].tx_hash, outcome.tx_hash);
    assert_eq!(history[0].owner, OWNER);
}

#[tokio::test]
async fn test_supply_is_sent_with_buffered_gas() {
    let harness = HarnessBuilder::new()
        .allowance(USDC, usdc(100))
        .balance("USDC", BASE_CHAIN_ID, dec!(500))
        .build();

    harness.executor.supply(usdc_request(usdc(50))).await.unwrap();

    let sent = harness.wallet.sent();
    assert_eq!(sent[0].gas, Some(NODE_GAS_ESTIMATE + NODE_GAS_ESTIMATE / 5));
    assert_eq!(sent[0].from, Some(OWNER));
}

#[tokio::test]
async fn test_permit_domain_uses_token_version() {
    let builder = HarnessBuilder::new()
        .permit_asset(USDC)
        .balance("USDC", BASE_CHAIN_ID, dec!(500));
    builder.token().set_permit_version("2");
    let harness = builder.build();

    harness.executor.supply(usdc_request(usdc(25))).await.unwrap();

    let permits = harness.wallet.permits();
    assert_eq!(permits.len(), 1);
    assert_eq!(permits[0].version, "2");
    assert_eq!(permits[0].token_name, "USD Coin");
}

#[tokio::test]
async fn test_reuses_matching_prior_signature() {
    let harness = HarnessBuilder::new()
        .permit_asset(USDC)
        .balance("USDC", BASE_CHAIN_ID, dec!(500))
        .build();

    let prior = SignedPermit {
        signature: Signature::new(U256::from(1), U256::from(2), false),
        amount: usdc(30),
        deadline: now() + 3_600,
        asset: USDC,
    };
    let mut request = usdc_request(usdc(30));
    request.prior_signature = Some(prior);

    let outcome = harness.executor.supply(request).await.unwrap();

    assert!(harness.wallet.permits().is_empty());
    assert_eq!(outcome.authorization, Authorization::Permit(prior));
    assert_eq!(harness.wallet.sent_kinds(), vec![CallKind::SupplyWithPermit]);

    let state = harness
        .executor
        .store()
        .get(&harness.executor.key(USDC))
        .unwrap();
    assert_eq!(state.gas_limit, 350_000);
}

#[tokio::test]
async fn test_expired_or_mismatched_signature_is_replaced() {
    let harness = HarnessBuilder::new()
        .permit_asset(USDC)
        .balance("USDC", BASE_CHAIN_ID, dec!(500))
        .build();

    let mut expired = usdc_request(usdc(30));
    expired.prior_signature = Some(SignedPermit {
        signature: Signature::new(U256::from(1), U256::from(2), false),
        amount: usdc(30),
        deadline: 1,
        asset: USDC,
    });
    harness.executor.supply(expired).await.unwrap();

    let mut other_amount = usdc_request(usdc(31));
    other_amount.prior_signature = Some(SignedPermit {
        signature: Signature::new(U256::from(1), U256::from(2), false),
        amount: usdc(30),
        deadline: now() + 3_600,
        asset: USDC,
    });
    harness.executor.supply(other_amount).await.unwrap();

    assert_eq!(harness.wallet.permits().len(), 2);
}

#[tokio::test]
async fn test_gas_recommendation_follows_intent() {
    let harness = HarnessBuilder::new()
        .balance("USDC", BASE_CHAIN_ID, dec!(500))
        .build();
    let mut events = harness.executor.store().subscribe();

    harness.executor.supply(usdc_request(usdc(20))).await.unwrap();

    let mut limits = Vec::new();
    while let Ok(event) = events.try_recv() {
        if limits.last() != Some(&event.state.gas_limit) {
            limits.push(event.state.gas_limit);
        }
    }
    // Pending approval adds its surcharge until the approval confirms
    assert_eq!(limits, vec![0, 365_000, 300_000]);
}

#[tokio::test]
async fn test_rejects_invalid_requests() {
    let harness = HarnessBuilder::new().build();
    let err = harness
        .executor
        .supply(usdc_request(U256::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(err, SupplyError::InvalidRequest(_)));
    assert!(harness
        .executor
        .store()
        .get(&harness.executor.key(USDC))
        .is_none());

    let harness = HarnessBuilder::new()
        .wallet(|wallet| wallet.on_chain(1))
        .build();
    let err = harness
        .executor
        .supply(usdc_request(usdc(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, SupplyError::InvalidRequest(_)));
    assert!(harness
        .executor
        .store()
        .get(&harness.executor.key(USDC))
        .is_none());
}
