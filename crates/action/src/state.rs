//! Process-wide supply progress.
//!
//! Every supply target (chain, pool, asset, owner) has at most one live
//! [`ActionState`]. Starting a new action for a target bumps its generation;
//! writes carrying an older [`ActionTicket`] are refused, so results arriving
//! late from a superseded action never overwrite the newer one.

use crate::SupplyError;
use alloy_primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};
use tokio::sync::broadcast;
use tracing::warn;

const EVENT_CAPACITY: usize = 64;

/// Identity of a supply target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionKey {
    pub chain_id: u64,
    pub pool: Address,
    pub asset: Address,
    pub owner: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxKind {
    Approval,
    Main,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Progress of one transaction (or signature) of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionState {
    pub kind: TxKind,
    pub status: TxStatus,
    pub hash: Option<TxHash>,
    pub error: Option<String>,
}

impl TransactionState {
    pub const fn idle(kind: TxKind) -> Self {
        Self {
            kind,
            status: TxStatus::Idle,
            hash: None,
            error: None,
        }
    }

    pub const fn is_loading(&self) -> bool {
        matches!(self.status, TxStatus::Loading)
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.status, TxStatus::Success)
    }

    pub fn start(&mut self) {
        *self = Self {
            status: TxStatus::Loading,
            ..Self::idle(self.kind)
        };
    }

    pub fn succeed(&mut self, hash: Option<TxHash>) {
        self.status = TxStatus::Success;
        self.hash = hash.or(self.hash);
        self.error = None;
    }

    pub fn fail(&mut self, message: String) {
        self.status = TxStatus::Error;
        self.error = Some(message);
    }

    pub fn reset(&mut self) {
        *self = Self::idle(self.kind);
    }
}

/// Everything known about the live action of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionState {
    /// Amount the action was started for, in base units
    pub amount: U256,
    pub generation: u64,
    pub approval: TransactionState,
    pub main: TransactionState,
    /// Recommended gas limit of the current intent
    pub gas_limit: u64,
    /// Allowance is being fetched
    pub preparing: bool,
    pub error: Option<SupplyError>,
}

impl ActionState {
    fn new(amount: U256, generation: u64) -> Self {
        Self {
            amount,
            generation,
            approval: TransactionState::idle(TxKind::Approval),
            main: TransactionState::idle(TxKind::Main),
            gas_limit: 0,
            preparing: false,
            error: None,
        }
    }

    /// An allowance read or a transaction of this action is in flight.
    pub const fn is_loading(&self) -> bool {
        self.preparing || self.approval.is_loading() || self.main.is_loading()
    }

    pub fn tx_mut(&mut self, kind: TxKind) -> &mut TransactionState {
        match kind {
            TxKind::Approval => &mut self.approval,
            TxKind::Main => &mut self.main,
        }
    }
}

/// Proof of ownership of a target's live action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionTicket {
    pub key: ActionKey,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionAction {
    Supply,
    SupplyWithPermit,
}

/// Completed supply kept in the store's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub action: TransactionAction,
    pub tx_hash: TxHash,
    pub chain_id: u64,
    pub asset: Address,
    pub owner: Address,
    pub amount: U256,
    pub symbol: String,
}

/// Published after every accepted write.
#[derive(Debug, Clone)]
pub struct StateEvent {
    pub key: ActionKey,
    pub state: ActionState,
}

#[derive(Debug, Default)]
struct Inner {
    actions: HashMap<ActionKey, ActionState>,
    history: Vec<TransactionRecord>,
    next_generation: u64,
}

/// Shared supply state, cheap to clone.
#[derive(Debug, Clone)]
pub struct TransactionStateStore {
    inner: Arc<RwLock<Inner>>,
    events: broadcast::Sender<StateEvent>,
}

impl Default for TransactionStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionStateStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::default(),
            events,
        }
    }

    /// Start a new action for `key`, abandoning any previous one.
    ///
    /// Fails with [`SupplyError::InProgress`] while an action for the same
    /// amount is still loading.
    pub fn begin(&self, key: ActionKey, amount: U256) -> Result<ActionTicket, SupplyError> {
        let state = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(live) = inner.actions.get(&key) {
                if live.amount == amount && live.is_loading() {
                    return Err(SupplyError::InProgress);
                }
                if live.is_loading() {
                    warn!(
                        asset = %key.asset,
                        previous = %live.amount,
                        amount = %amount,
                        "Abandoning in-flight supply for a new amount"
                    );
                }
            }

            inner.next_generation += 1;
            let state = ActionState::new(amount, inner.next_generation);
            inner.actions.insert(key, state.clone());
            state
        };

        let ticket = ActionTicket {
            key,
            generation: state.generation,
        };
        self.publish(key, state);
        Ok(ticket)
    }

    /// Apply `f` to the ticket's action if it is still the live one.
    pub fn update(
        &self,
        ticket: &ActionTicket,
        f: impl FnOnce(&mut ActionState),
    ) -> Result<(), SupplyError> {
        let state = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            let state = inner
                .actions
                .get_mut(&ticket.key)
                .filter(|state| state.generation == ticket.generation)
                .ok_or(SupplyError::Superseded)?;
            f(state);
            state.clone()
        };

        self.publish(ticket.key, state);
        Ok(())
    }

    /// Record a terminal error: loading transactions turn to `Error`.
    pub fn fail(&self, ticket: &ActionTicket, err: &SupplyError) -> Result<(), SupplyError> {
        self.update(ticket, |state| {
            let message = err.user_message();
            for kind in [TxKind::Approval, TxKind::Main] {
                let tx = state.tx_mut(kind);
                if tx.is_loading() {
                    tx.fail(message.clone());
                }
            }
            state.preparing = false;
            state.error = Some(err.clone());
        })
    }

    pub fn is_current(&self, ticket: &ActionTicket) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .actions
            .get(&ticket.key)
            .is_some_and(|state| state.generation == ticket.generation)
    }

    pub fn get(&self, key: &ActionKey) -> Option<ActionState> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .actions
            .get(key)
            .cloned()
    }

    /// Append a completed supply to the history, if the ticket is live.
    pub fn record(
        &self,
        ticket: &ActionTicket,
        record: TransactionRecord,
    ) -> Result<(), SupplyError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let live = inner
            .actions
            .get(&ticket.key)
            .is_some_and(|state| state.generation == ticket.generation);
        if !live {
            return Err(SupplyError::Superseded);
        }
        inner.history.push(record);
        Ok(())
    }

    pub fn history(&self) -> Vec<TransactionRecord> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }

    fn publish(&self, key: ActionKey, state: ActionState) {
        // No subscribers is fine
        let _ = self.events.send(StateEvent { key, state });
    }
}
