//! Supply orchestration.
//!
//! One call to [`SupplyExecutor::supply`] drives a single user action
//! through its stages, strictly in order:
//!
//! 1. resolve the allowance and decide on an authorization (permit signature
//!    or on-chain approval, re-resolving the allowance after each approval)
//! 2. bridge any destination-chain shortfall
//! 3. submit `supply`/`supplyWithPermit` and wait for confirmation
//! 4. record the supply and signal cache invalidation
//!
//! Every stage reports into the [`TransactionStateStore`] with the action's
//! ticket. Once a newer action for the same target has started, those writes
//! fail with [`SupplyError::Superseded`] and this action stops.

use crate::{
    state::{ActionKey, ActionTicket, TransactionAction, TransactionRecord},
    unix_now, ActionKind, Approve, ApproveAction, ApprovalMethod, ApprovalStrategyDecider,
    Authorization, GasEstimator, SignedPermit, Supply, SupplyAction, SupplyError,
    TransactionStateStore, Wallet,
};
use allowance::{Allowance, AllowanceResolver};
use alloy_primitives::{utils::format_units, Address, TxHash, U256};
use balance::BalanceSource;
use bridge::{BridgeReceipt, LiquidityBridgeAdapter};
use client::PermitPayload;
use config::{MarketConfig, SupplyConfig};
use rust_decimal::Decimal;
use std::{str::FromStr, sync::Arc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// A user's request to supply `amount` of `asset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplyRequest {
    pub asset: Address,
    /// Symbol as shown to the user; aliases are normalized for balance lookups
    pub symbol: String,
    pub decimals: u8,
    /// Amount in base units
    pub amount: U256,
    pub preference: ApprovalMethod,
    /// Receiver of the aTokens, the wallet when unset
    pub on_behalf_of: Option<Address>,
    /// Signature still held from an earlier attempt
    pub prior_signature: Option<SignedPermit>,
}

/// A confirmed supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplyOutcome {
    /// Amount that was supplied, in base units
    pub amount: U256,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
    pub authorization: Authorization,
    pub bridge: Option<BridgeReceipt>,
}

/// Sent after a confirmed supply so position and balance reads are refetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInvalidation {
    pub key: ActionKey,
    pub symbol: String,
    pub tx_hash: TxHash,
}

pub struct SupplyExecutor {
    wallet: Arc<dyn Wallet>,
    allowance: AllowanceResolver,
    balances: Arc<dyn BalanceSource>,
    bridge: LiquidityBridgeAdapter,
    market: MarketConfig,
    config: SupplyConfig,
    store: TransactionStateStore,
    invalidations: Option<mpsc::UnboundedSender<CacheInvalidation>>,
}

impl SupplyExecutor {
    pub fn new(
        wallet: Arc<dyn Wallet>,
        allowance: AllowanceResolver,
        balances: Arc<dyn BalanceSource>,
        bridge: LiquidityBridgeAdapter,
        market: MarketConfig,
        config: SupplyConfig,
    ) -> Self {
        Self {
            wallet,
            allowance,
            balances,
            bridge,
            market,
            config,
            store: TransactionStateStore::new(),
            invalidations: None,
        }
    }

    /// Share a store with other executors or readers.
    pub fn with_store(mut self, store: TransactionStateStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_invalidation_sink(mut self, sink: mpsc::UnboundedSender<CacheInvalidation>) -> Self {
        self.invalidations = Some(sink);
        self
    }

    pub const fn store(&self) -> &TransactionStateStore {
        &self.store
    }

    pub const fn market(&self) -> &MarketConfig {
        &self.market
    }

    /// Store key of a supply of `asset` by this executor's wallet.
    pub fn key(&self, asset: Address) -> ActionKey {
        ActionKey {
            chain_id: self.market.chain_id,
            pool: self.market.pool,
            asset,
            owner: self.wallet.address(),
        }
    }

    /// Run a supply to completion.
    ///
    /// Zero amounts and a wallet on another chain are refused before a
    /// ticket is issued, so they leave no entry in the store.
    pub async fn supply(&self, request: SupplyRequest) -> Result<SupplyOutcome, SupplyError> {
        if request.amount.is_zero() {
            return Err(SupplyError::InvalidRequest(
                "Supply amount must be greater than zero".to_string(),
            ));
        }
        if self.wallet.chain_id() != self.market.chain_id {
            return Err(SupplyError::InvalidRequest(format!(
                "Wallet is connected to chain {}, market is on chain {}",
                self.wallet.chain_id(),
                self.market.chain_id
            )));
        }

        let ticket = self.store.begin(self.key(request.asset), request.amount)?;
        info!(
            asset = %request.asset,
            symbol = %request.symbol,
            amount = %request.amount,
            generation = ticket.generation,
            "Starting supply"
        );

        match self.run(&ticket, &request).await {
            Ok(outcome) => Ok(outcome),
            Err(SupplyError::Superseded) => {
                warn!(
                    asset = %request.asset,
                    generation = ticket.generation,
                    "Supply superseded, discarding result"
                );
                Err(SupplyError::Superseded)
            }
            Err(err) => {
                error!(asset = %request.asset, error = %err, "Supply failed");
                if self.store.fail(&ticket, &err).is_err() {
                    debug!(generation = ticket.generation, "Failure of a superseded supply");
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        ticket: &ActionTicket,
        request: &SupplyRequest,
    ) -> Result<SupplyOutcome, SupplyError> {
        let authorization = self.authorize(ticket, request).await?;

        self.store.update(ticket, |state| state.main.start())?;
        let bridge = self.cover_shortfall(ticket, request).await?;

        let owner = ticket.key.owner;
        let action = SupplyAction::new(
            Arc::clone(&self.wallet),
            self.config.gas,
            self.config.confirmations,
            authorization,
            Supply {
                pool: self.market.pool,
                asset: request.asset,
                amount: request.amount,
                owner,
                on_behalf_of: request.on_behalf_of.unwrap_or(owner),
                referral_code: self.config.referral_code,
            },
        );

        let tx_hash = action.submit().await?;
        self.store
            .update(ticket, |state| state.main.hash = Some(tx_hash))?;

        let result = action.confirm(tx_hash).await?;
        self.store
            .update(ticket, |state| state.main.succeed(Some(tx_hash)))?;

        self.store.record(
            ticket,
            TransactionRecord {
                action: if authorization.is_permit() {
                    TransactionAction::SupplyWithPermit
                } else {
                    TransactionAction::Supply
                },
                tx_hash,
                chain_id: ticket.key.chain_id,
                asset: request.asset,
                owner,
                amount: request.amount,
                symbol: request.symbol.clone(),
            },
        )?;

        if let Some(sink) = &self.invalidations {
            let signal = CacheInvalidation {
                key: ticket.key,
                symbol: request.symbol.clone(),
                tx_hash,
            };
            if sink.send(signal).is_err() {
                debug!("Cache invalidation receiver dropped");
            }
        }

        info!(
            tx_hash = %result.tx_hash,
            block_number = result.block_number,
            amount = %request.amount,
            "Supply complete"
        );

        Ok(SupplyOutcome {
            amount: request.amount,
            tx_hash: result.tx_hash,
            block_number: result.block_number,
            gas_used: result.gas_used,
            authorization,
            bridge,
        })
    }

    /// Obtain whatever lets the pool pull `request.amount`.
    async fn authorize(
        &self,
        ticket: &ActionTicket,
        request: &SupplyRequest,
    ) -> Result<Authorization, SupplyError> {
        let permit_available = self.config.permit_enabled(request.asset)
            && !self.market.is_wrapped_native(request.asset);
        let estimator = GasEstimator::new(self.config.gas);

        let mut allowance = self.refresh_allowance(ticket, request.asset).await?;
        let mut approval: Option<TxHash> = None;
        let mut approval_succeeded = false;
        let mut rounds = 0;

        loop {
            let intent = ApprovalStrategyDecider::new(unix_now()).decide(
                request.amount,
                &allowance,
                permit_available,
                request.preference,
                request.prior_signature.as_ref(),
                approval_succeeded,
            );

            if intent.clear_prior_approval {
                approval_succeeded = false;
            }
            // A reused signature still submits supplyWithPermit
            let gas_limit = estimator.estimate(
                ActionKind::Supply,
                intent.required,
                intent.use_permit || intent.reuse_signature,
                approval_succeeded,
            );
            self.store.update(ticket, |state| {
                if intent.clear_prior_approval {
                    state.approval.reset();
                }
                state.gas_limit = gas_limit;
            })?;

            debug!(
                required = intent.required,
                use_permit = intent.use_permit,
                allowance = %intent.current_allowance,
                gas_limit,
                "Approval intent"
            );

            if !intent.required {
                return Ok(match (intent.reuse_signature, request.prior_signature, approval) {
                    (true, Some(permit), _) => Authorization::Permit(permit),
                    (_, _, Some(tx_hash)) => Authorization::OnChainApproval(tx_hash),
                    _ => Authorization::ExistingAllowance,
                });
            }

            if intent.use_permit {
                let permit = self.sign_permit(ticket, request).await?;
                return Ok(Authorization::Permit(permit));
            }

            if rounds == self.config.max_approval_rounds {
                return Err(SupplyError::InsufficientAllowance {
                    required: request.amount,
                    current: allowance.amount,
                });
            }
            rounds += 1;

            approval = Some(self.approve(ticket, request).await?);
            approval_succeeded = true;
            allowance = self.refresh_allowance(ticket, request.asset).await?;

            if !allowance.covers(request.amount) {
                warn!(
                    required = %request.amount,
                    current = %allowance.amount,
                    round = rounds,
                    "Approval confirmed but allowance is still short, approving again"
                );
            }
        }
    }

    async fn refresh_allowance(
        &self,
        ticket: &ActionTicket,
        asset: Address,
    ) -> Result<Allowance, SupplyError> {
        self.store.update(ticket, |state| state.preparing = true)?;
        let allowance = self
            .allowance
            .fetch(asset, ticket.key.owner, self.market.pool)
            .await;
        self.store.update(ticket, |state| state.preparing = false)?;
        Ok(allowance?)
    }

    async fn sign_permit(
        &self,
        ticket: &ActionTicket,
        request: &SupplyRequest,
    ) -> Result<SignedPermit, SupplyError> {
        self.store.update(ticket, |state| state.approval.start())?;

        let owner = ticket.key.owner;
        let reader = self.allowance.reader();
        let token_name = reader.name(request.asset).await?;
        let version = reader.permit_version(request.asset).await?;
        let nonce = reader.permit_nonce(request.asset, owner).await?;
        let deadline = unix_now().saturating_add(self.config.permit_ttl_secs);

        let payload = PermitPayload {
            token_name,
            version,
            chain_id: self.market.chain_id,
            token: request.asset,
            owner,
            spender: self.market.pool,
            value: request.amount,
            nonce,
            deadline,
        };
        let signature = self.wallet.sign_permit(payload).await?;

        self.store
            .update(ticket, |state| state.approval.succeed(None))?;
        info!(asset = %request.asset, deadline, "Permit signed");

        Ok(SignedPermit {
            signature,
            amount: request.amount,
            deadline,
            asset: request.asset,
        })
    }

    async fn approve(
        &self,
        ticket: &ActionTicket,
        request: &SupplyRequest,
    ) -> Result<TxHash, SupplyError> {
        self.store.update(ticket, |state| state.approval.start())?;

        let action = ApproveAction::new(
            Arc::clone(&self.wallet),
            self.allowance.reader(),
            self.config.gas,
            self.config.confirmations,
            Approve {
                asset: request.asset,
                owner: ticket.key.owner,
                spender: self.market.pool,
                amount: request.amount,
            },
        );

        let tx_hash = action.submit().await?;
        self.store
            .update(ticket, |state| state.approval.hash = Some(tx_hash))?;

        action.confirm(tx_hash).await?;
        self.store
            .update(ticket, |state| state.approval.succeed(Some(tx_hash)))?;

        Ok(tx_hash)
    }

    async fn cover_shortfall(
        &self,
        ticket: &ActionTicket,
        request: &SupplyRequest,
    ) -> Result<Option<BridgeReceipt>, SupplyError> {
        let requested = to_decimal(request.amount, request.decimals)?;
        let snapshot = self
            .balances
            .snapshot(&request.symbol)
            .await
            .map_err(|e| SupplyError::Network(e.to_string()))?;

        let receipt = self
            .bridge
            .maybe_bridge(requested, &request.symbol, self.market.chain_id, &snapshot)
            .await?;

        if !self.store.is_current(ticket) {
            return Err(SupplyError::Superseded);
        }
        Ok(receipt)
    }
}

/// Base units to whole tokens.
fn to_decimal(amount: U256, decimals: u8) -> Result<Decimal, SupplyError> {
    format_units(amount, decimals)
        .map_err(|e| SupplyError::InvalidRequest(e.to_string()))
        .and_then(|units| {
            Decimal::from_str(&units).map_err(|e| SupplyError::InvalidRequest(e.to_string()))
        })
}
