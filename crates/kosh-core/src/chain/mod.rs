//! Chain service capability
//!
//! A [`ChainService`] turns a seed phrase and a derivation path into an
//! address/private-key pair, validates addresses, and reports balances.
//! Services are injected through a [`ChainRegistry`] owned by the caller;
//! nothing here is process-global.
//!
//! The built-in services derive keys locally but ship without a balance
//! backend: `get_balance` fails with [`Error::Network`] until an RPC-backed
//! implementation is registered in their place.

mod bitcoin;
mod evm;
mod tron;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use bitcoin::BitcoinService;
pub use evm::EvmService;
pub use tron::TronService;

use crate::mnemonic::seed_from_mnemonic;
use crate::{ChainId, Error, Result, SecretString};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Address and plaintext private key derived for one path
pub struct DerivedAccount {
    /// Chain-encoded address
    pub address: String,
    /// Private key in the chain's customary text form
    pub private_key: SecretString,
}

impl std::fmt::Debug for DerivedAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedAccount")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Balance snapshot in display units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// Queried address
    pub address: String,
    /// Chain
    pub network: ChainId,
    /// USDT token balance
    #[serde(rename = "USDT")]
    pub usdt: f64,
    /// Native currency balance
    pub native: f64,
}

impl Balance {
    /// All-zero balance
    pub fn zero(address: &str, network: ChainId) -> Self {
        Self {
            address: address.to_string(),
            network,
            usdt: 0.0,
            native: 0.0,
        }
    }

    /// Whether every amount is zero
    pub fn is_zero(&self) -> bool {
        self.usdt == 0.0 && self.native == 0.0
    }
}

/// Per-chain capability
#[async_trait]
pub trait ChainService: Send + Sync {
    /// Chain served
    fn chain(&self) -> ChainId;

    /// Derive the account at `path` from a BIP-39 seed
    fn derive_account(&self, seed: &[u8], path: &str) -> Result<DerivedAccount>;

    /// Derive the account at `path` from a checksum-valid mnemonic
    fn create_wallet_from_mnemonic(&self, mnemonic: &str, path: &str) -> Result<DerivedAccount> {
        let seed = seed_from_mnemonic(mnemonic)?;
        self.derive_account(seed.as_slice(), path)
    }

    /// Query the balance of `address`
    async fn get_balance(&self, address: &str) -> Result<Balance>;

    /// Check address syntax for this chain
    fn is_valid_address(&self, address: &str) -> bool;
}

/// Set of chain services keyed by chain
#[derive(Clone, Default)]
pub struct ChainRegistry {
    services: HashMap<ChainId, Arc<dyn ChainService>>,
}

impl ChainRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the four built-in derivation services
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TronService::new()));
        registry.register(Arc::new(EvmService::ethereum()));
        registry.register(Arc::new(EvmService::bsc()));
        registry.register(Arc::new(BitcoinService::new()));
        registry
    }

    /// Register (or replace) the service for its chain
    pub fn register(&mut self, service: Arc<dyn ChainService>) {
        self.services.insert(service.chain(), service);
    }

    /// Service for `chain`
    pub fn get(&self, chain: ChainId) -> Result<Arc<dyn ChainService>> {
        self.services
            .get(&chain)
            .cloned()
            .ok_or_else(|| Error::Validation(format!("No service registered for {}", chain)))
    }

    /// Chains with a registered service
    pub fn chains(&self) -> Vec<ChainId> {
        let mut chains: Vec<ChainId> = self.services.keys().copied().collect();
        chains.sort();
        chains
    }
}

impl std::fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("chains", &self.chains())
            .finish()
    }
}

fn no_balance_backend(chain: ChainId) -> Error {
    Error::Network(format!("No balance backend configured for {}", chain))
}
