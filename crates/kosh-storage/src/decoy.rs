//! Decoy wallet universe
//!
//! The decoy wallet is derived from the real mnemonic with its word order
//! reversed, so it is stable across regenerations yet shares no keys with
//! the real wallet. Reversal usually breaks the BIP-39 checksum, so the
//! reversed words are turned into a seed without checksum enforcement.
//!
//! Decoy secrets are sealed under [`DECOY_PASSPHRASE`] and the record is
//! kept in plain JSON at [`DECOY_RECORD_KEY`].

use crate::storage::Storage;
use crate::{aead_codec, Result};
use kosh_core::mnemonic::{generate_mnemonic, reverse_words, seed_from_words_unchecked};
use kosh_core::{ChainId, ChainRegistry, EncryptedPayload, WalletRecord};
use kosh_params::layout::{DECOY_PASSPHRASE, DECOY_RECORD_KEY};
use std::sync::Arc;

const FILLER_WORD_COUNT: usize = 12;

/// Builds decoy wallet records
#[derive(Debug, Clone)]
pub struct DecoyWalletGenerator {
    chains: ChainRegistry,
}

impl DecoyWalletGenerator {
    /// Generator deriving through `chains`
    pub fn new(chains: ChainRegistry) -> Self {
        Self { chains }
    }

    /// Decoy record for the real mnemonic sealed in `encrypted_mnemonic`.
    ///
    /// `password` is the real wallet password. If the mnemonic cannot be
    /// recovered the result is [`empty_record`](Self::empty_record).
    pub fn generate(&self, encrypted_mnemonic: &EncryptedPayload, password: &str) -> Result<WalletRecord> {
        match self.derive_record(encrypted_mnemonic, password) {
            Some(record) => Ok(record),
            None => {
                tracing::debug!("Falling back to an empty decoy record");
                Self::empty_record()
            }
        }
    }

    fn derive_record(&self, encrypted_mnemonic: &EncryptedPayload, password: &str) -> Option<WalletRecord> {
        let phrase = aead_codec::decrypt_any(&encrypted_mnemonic.to_string(), password)?;
        let reversed = reverse_words(&phrase);
        let seed = seed_from_words_unchecked(&reversed).ok()?;

        let sealed_phrase = aead_codec::encrypt(&reversed, DECOY_PASSPHRASE).ok()?;
        let mut record = WalletRecord::new(sealed_phrase);

        for chain in ChainId::ALL {
            let service = match self.chains.get(chain) {
                Ok(service) => service,
                Err(e) => {
                    tracing::debug!("No decoy account for {}: {}", chain, e);
                    continue;
                }
            };
            let account = match service.derive_account(seed.as_slice(), &chain.derivation_path(0)) {
                Ok(account) => account,
                Err(e) => {
                    tracing::debug!("No decoy account for {}: {}", chain, e);
                    continue;
                }
            };
            let private_key = aead_codec::encrypt(&account.private_key, DECOY_PASSPHRASE).ok()?;
            record.push_key(chain, account.address, private_key);
        }

        Some(record)
    }

    /// Well-formed record with no addresses and a random filler phrase
    pub fn empty_record() -> Result<WalletRecord> {
        let filler = generate_mnemonic(FILLER_WORD_COUNT)?;
        let sealed = aead_codec::encrypt(&filler, DECOY_PASSPHRASE)?;
        Ok(WalletRecord::new(sealed))
    }
}

/// Persistence for the decoy record
#[derive(Clone)]
pub struct DecoyStore {
    storage: Arc<dyn Storage>,
}

impl DecoyStore {
    /// Store decoys in `storage`
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Persist `record`
    pub fn save(&self, record: &WalletRecord) -> Result<()> {
        self.storage.set(DECOY_RECORD_KEY, &record.to_json()?)
    }

    /// Stored decoy record, if present and readable
    pub fn load(&self) -> Option<WalletRecord> {
        match self.storage.get(DECOY_RECORD_KEY) {
            Ok(Some(json)) => WalletRecord::from_json(&json).ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("Decoy record unreadable: {}", e);
                None
            }
        }
    }

    /// Whether a decoy record is stored
    pub fn exists(&self) -> bool {
        matches!(self.storage.get(DECOY_RECORD_KEY), Ok(Some(_)))
    }

    /// Remove the decoy record
    pub fn clear(&self) -> Result<()> {
        self.storage.remove(DECOY_RECORD_KEY)
    }
}

impl std::fmt::Debug for DecoyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoyStore").finish_non_exhaustive()
    }
}
