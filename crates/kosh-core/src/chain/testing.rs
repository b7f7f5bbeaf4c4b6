//! Test doubles for chain services

use super::{Balance, ChainService, DerivedAccount};
use crate::{ChainId, Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Wraps a real derivation service and answers balances from a fixed table.
///
/// Unknown addresses fail with a network error. Every balance query is
/// counted so tests can assert that a code path never reached the chain.
pub struct StaticBalanceService {
    inner: Arc<dyn ChainService>,
    balances: Mutex<HashMap<String, Balance>>,
    calls: AtomicUsize,
}

impl StaticBalanceService {
    /// Wrap `inner`
    pub fn new(inner: Arc<dyn ChainService>) -> Self {
        Self {
            inner,
            balances: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Set the balance reported for `address`
    pub fn set_balance(&self, address: &str, usdt: f64, native: f64) {
        let balance = Balance {
            address: address.to_string(),
            network: self.inner.chain(),
            usdt,
            native,
        };
        if let Ok(mut balances) = self.balances.lock() {
            balances.insert(address.to_string(), balance);
        }
    }

    /// Number of `get_balance` calls received
    pub fn balance_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainService for StaticBalanceService {
    fn chain(&self) -> ChainId {
        self.inner.chain()
    }

    fn derive_account(&self, seed: &[u8], path: &str) -> Result<DerivedAccount> {
        self.inner.derive_account(seed, path)
    }

    async fn get_balance(&self, address: &str) -> Result<Balance> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let balances = self
            .balances
            .lock()
            .map_err(|_| Error::Network("balance table poisoned".to_string()))?;
        balances
            .get(address)
            .cloned()
            .ok_or_else(|| Error::Network(format!("unknown address {}", address)))
    }

    fn is_valid_address(&self, address: &str) -> bool {
        self.inner.is_valid_address(address)
    }
}
