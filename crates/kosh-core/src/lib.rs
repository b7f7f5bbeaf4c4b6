//! Kosh wallet core
//!
//! This crate implements the chain-facing half of the wallet: BIP-39
//! mnemonics, BIP-32/44 secp256k1 key derivation, per-chain address
//! encoding, the [`ChainService`] capability, and the wallet record data
//! model shared by the storage and service layers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod backup;
pub mod chain;
pub mod derivation;
pub mod error;
pub mod mnemonic;
pub mod payload;
pub mod wallet;

pub use backup::{BackupChain, BackupChains, BackupDocument, BackupMetadata};
pub use chain::{
    Balance, BitcoinService, ChainRegistry, ChainService, DerivedAccount, EvmService, TronService,
};
pub use derivation::{derive_keypair, Secp256k1Keypair};
pub use error::{Error, Result};
pub use kosh_params::ChainId;
pub use mnemonic::{generate_mnemonic, reverse_words, validate_mnemonic};
pub use payload::EncryptedPayload;
pub use wallet::{DerivedKey, MasterMnemonic, Networks, WalletRecord};

/// Heap string wiped on drop, used for every plaintext secret
pub type SecretString = zeroize::Zeroizing<String>;
