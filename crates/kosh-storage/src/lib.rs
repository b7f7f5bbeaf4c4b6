//! Encrypted, camouflaged storage for Kosh Wallet
//!
//! Provides the key-value storage capability (in-memory and SQLite with WAL
//! mode and migrations) and every at-rest protection layered on top of it.
//!
//! ## Security Features
//!
//! - **Key Derivation**: PBKDF2-HMAC-SHA256 with fixed per-purpose work tiers
//! - **Field Encryption**: AES-256-GCM (`v2`) with read support for the
//!   legacy OpenSSL-style CBC payloads
//! - **Fragmented Storage**: records split across innocuous cache keys with
//!   an encrypted manifest and scattered decoy entries
//! - **Backup Container**: sealed binary frame hidden between random padding
//! - **Duress PIN**: any wrong PIN silently opens a decoy wallet
//! - **Decoy Wallets**: deterministic reversed-mnemonic wallet universe

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aead_codec;
pub mod container;
pub mod database;
pub mod decoy;
pub mod duress;
pub mod error;
pub mod fragment;
pub mod kdf;
pub mod legacy;
pub mod migrations;
/// In-memory session secret storage.
pub mod secrets;
pub mod storage;

pub use database::SqliteStorage;
pub use decoy::{DecoyStore, DecoyWalletGenerator};
pub use duress::{DuressGate, GateState, PinRecord, VaultMode};
pub use error::{Error, Result};
pub use fragment::FragmentStore;
pub use secrets::SessionSecrets;
pub use storage::{MemoryStorage, Storage};
