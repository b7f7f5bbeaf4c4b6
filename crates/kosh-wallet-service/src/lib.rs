//! Kosh wallet service
//!
//! The [`WalletVault`] orchestrator: PIN-gated sessions over fragmented
//! storage, wallet creation and address derivation through injected chain
//! services, backup export/import and balance queries.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod isolated;
pub mod vault;

pub use config::VaultConfig;
pub use error::{Error, Result};
pub use kosh_storage::{GateState, VaultMode};
pub use vault::{BackupFile, WalletVault};
