//! TRON

use super::{no_balance_backend, Balance, ChainService, DerivedAccount};
use crate::address::{is_valid_tron_address, tron_address};
use crate::derivation::derive_keypair;
use crate::{ChainId, Result};
use async_trait::async_trait;

/// Key derivation for TRON; private keys are bare hex
#[derive(Debug, Clone, Copy, Default)]
pub struct TronService;

impl TronService {
    /// Create service
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChainService for TronService {
    fn chain(&self) -> ChainId {
        ChainId::Tron
    }

    fn derive_account(&self, seed: &[u8], path: &str) -> Result<DerivedAccount> {
        let pair = derive_keypair(seed, path)?;
        Ok(DerivedAccount {
            address: tron_address(pair.public_uncompressed()),
            private_key: pair.secret_hex(),
        })
    }

    async fn get_balance(&self, _address: &str) -> Result<Balance> {
        Err(no_balance_backend(ChainId::Tron))
    }

    fn is_valid_address(&self, address: &str) -> bool {
        is_valid_tron_address(address)
    }
}
