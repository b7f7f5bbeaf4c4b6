//! Ethereum-compatible chains (Ethereum, BSC)

use super::{no_balance_backend, Balance, ChainService, DerivedAccount};
use crate::address::{evm_address, is_valid_evm_address};
use crate::derivation::derive_keypair;
use crate::{ChainId, Result};
use async_trait::async_trait;
use zeroize::Zeroizing;

/// Key derivation for EVM chains; private keys are `0x`-prefixed hex
#[derive(Debug, Clone, Copy)]
pub struct EvmService {
    chain: ChainId,
}

impl EvmService {
    /// Ethereum mainnet
    pub fn ethereum() -> Self {
        Self {
            chain: ChainId::Ethereum,
        }
    }

    /// BNB Smart Chain
    pub fn bsc() -> Self {
        Self { chain: ChainId::Bsc }
    }
}

#[async_trait]
impl ChainService for EvmService {
    fn chain(&self) -> ChainId {
        self.chain
    }

    fn derive_account(&self, seed: &[u8], path: &str) -> Result<DerivedAccount> {
        let pair = derive_keypair(seed, path)?;
        Ok(DerivedAccount {
            address: evm_address(pair.public_uncompressed()),
            private_key: Zeroizing::new(format!("0x{}", pair.secret_hex().as_str())),
        })
    }

    async fn get_balance(&self, _address: &str) -> Result<Balance> {
        Err(no_balance_backend(self.chain))
    }

    fn is_valid_address(&self, address: &str) -> bool {
        is_valid_evm_address(address)
    }
}
