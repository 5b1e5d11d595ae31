//! Allowance resolution and the shared allowance cache.

use crate::{Allowance, AllowanceError, AllowanceKey, TokenReader};
use alloy_primitives::Address;
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};
use tracing::debug;

/// Most recent allowance reads, shared by every in-flight action.
///
/// Entries are stale between refreshes; consumers re-resolve before acting.
#[derive(Debug, Clone, Default)]
pub struct AllowanceCache {
    entries: Arc<RwLock<HashMap<AllowanceKey, Allowance>>>,
}

impl AllowanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &AllowanceKey) -> Option<Allowance> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }

    fn insert(&self, allowance: Allowance) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(allowance.key(), allowance);
    }

    pub fn remove(&self, key: &AllowanceKey) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// Fetches spender allowances and publishes them to the cache.
#[derive(Clone)]
pub struct AllowanceResolver {
    reader: Arc<dyn TokenReader>,
    cache: AllowanceCache,
}

impl AllowanceResolver {
    pub fn new(reader: Arc<dyn TokenReader>, cache: AllowanceCache) -> Self {
        Self { reader, cache }
    }

    /// Read the current allowance from chain and update the cache entry.
    pub async fn fetch(
        &self,
        asset: Address,
        owner: Address,
        spender: Address,
    ) -> Result<Allowance, AllowanceError> {
        let amount = self.reader.allowance(asset, owner, spender).await?;
        let allowance = Allowance {
            owner,
            spender,
            asset,
            amount,
        };

        debug!(
            asset = %asset,
            owner = %owner,
            spender = %spender,
            amount = %amount,
            "Allowance resolved"
        );

        self.cache.insert(allowance);
        Ok(allowance)
    }

    /// Last resolved allowance, if any.
    pub fn cached(&self, asset: Address, owner: Address, spender: Address) -> Option<Allowance> {
        self.cache.get(&AllowanceKey {
            asset,
            owner,
            spender,
        })
    }

    /// Reader used for allowance and permit metadata reads.
    pub fn reader(&self) -> Arc<dyn TokenReader> {
        Arc::clone(&self.reader)
    }
}
