//! Bitcoin (native segwit)

use super::{no_balance_backend, Balance, ChainService, DerivedAccount};
use crate::address::{bitcoin_p2wpkh_address, is_valid_bitcoin_address};
use crate::derivation::derive_keypair;
use crate::{ChainId, Result};
use async_trait::async_trait;

/// Key derivation for Bitcoin P2WPKH; private keys are bare hex
#[derive(Debug, Clone, Copy, Default)]
pub struct BitcoinService;

impl BitcoinService {
    /// Create service
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChainService for BitcoinService {
    fn chain(&self) -> ChainId {
        ChainId::Bitcoin
    }

    fn derive_account(&self, seed: &[u8], path: &str) -> Result<DerivedAccount> {
        let pair = derive_keypair(seed, path)?;
        Ok(DerivedAccount {
            address: bitcoin_p2wpkh_address(pair.public_compressed())?,
            private_key: pair.secret_hex(),
        })
    }

    async fn get_balance(&self, _address: &str) -> Result<Balance> {
        Err(no_balance_backend(ChainId::Bitcoin))
    }

    fn is_valid_address(&self, address: &str) -> bool {
        is_valid_bitcoin_address(address)
    }
}
