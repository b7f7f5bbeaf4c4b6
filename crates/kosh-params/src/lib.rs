//! Kosh wallet parameters and constants
//!
//! This crate provides the supported chain identifiers, BIP-44 derivation
//! conventions, key-derivation work-factor tiers, and the storage layout
//! constants (camouflaged key names, backup framing) that must stay stable
//! across releases to keep existing vaults and backups readable.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chain;
pub mod kdf;
pub mod layout;

pub use chain::ChainId;
pub use kdf::KdfTier;

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown chain identifier
    #[error("Invalid chain: {0}")]
    InvalidChain(String),
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;
