//! Backup document model
//!
//! The exported document restates each chain's network labels and
//! derivation prefix next to its addresses so a backup is self-describing.
//! On import only the mnemonic and address lists are authoritative.

use crate::wallet::{timestamp_now, DerivedKey, MasterMnemonic, Networks, WalletRecord};
use crate::ChainId;
use kosh_params::layout::RECORD_VERSION;
use serde::{Deserialize, Serialize};

/// Per-chain backup section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupChain {
    /// Token standard label (`TRC20`, `ERC20`, ...)
    pub network_id: String,
    /// Native currency ticker
    pub currency: String,
    /// Derivation path prefix (`m/44'/195'/`)
    pub derivation_path: String,
    /// Derived keys
    #[serde(default)]
    pub addresses: Vec<DerivedKey>,
}

impl BackupChain {
    fn for_chain(chain: ChainId, addresses: Vec<DerivedKey>) -> Self {
        Self {
            network_id: chain.network_id().to_string(),
            currency: chain.currency().to_string(),
            derivation_path: chain.derivation_prefix(),
            addresses,
        }
    }
}

/// All chain sections; absent sections import as empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupChains {
    /// TRON section
    #[serde(rename = "TRON", default, skip_serializing_if = "Option::is_none")]
    pub tron: Option<BackupChain>,
    /// Ethereum section
    #[serde(rename = "ETHEREUM", default, skip_serializing_if = "Option::is_none")]
    pub ethereum: Option<BackupChain>,
    /// BSC section
    #[serde(rename = "BSC", default, skip_serializing_if = "Option::is_none")]
    pub bsc: Option<BackupChain>,
    /// Bitcoin section
    #[serde(rename = "BITCOIN", default, skip_serializing_if = "Option::is_none")]
    pub bitcoin: Option<BackupChain>,
}

/// Backup metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    /// Wallet creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Record version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Export time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<String>,
}

/// Complete backup document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    /// Encrypted master mnemonic
    pub master_mnemonic: MasterMnemonic,
    /// Chain sections
    pub blockchains: BackupChains,
    /// Metadata
    #[serde(default)]
    pub metadata: BackupMetadata,
}

impl BackupDocument {
    /// Build an export document from a record, stamped with the current time
    pub fn from_record(record: &WalletRecord) -> Self {
        let section = |chain: ChainId| {
            Some(BackupChain::for_chain(
                chain,
                record.networks.get(chain).to_vec(),
            ))
        };
        Self {
            master_mnemonic: record.master_mnemonic.clone(),
            blockchains: BackupChains {
                tron: section(ChainId::Tron),
                ethereum: section(ChainId::Ethereum),
                bsc: section(ChainId::Bsc),
                bitcoin: section(ChainId::Bitcoin),
            },
            metadata: BackupMetadata {
                created_at: Some(record.created_at.clone()),
                version: Some(record.version.clone()),
                exported_at: Some(timestamp_now()),
            },
        }
    }

    /// Convert into a wallet record
    pub fn into_record(self) -> WalletRecord {
        let addresses = |section: Option<BackupChain>| {
            section.map(|s| s.addresses).unwrap_or_default()
        };
        WalletRecord {
            master_mnemonic: self.master_mnemonic,
            networks: Networks {
                tron: addresses(self.blockchains.tron),
                ethereum: addresses(self.blockchains.ethereum),
                bsc: addresses(self.blockchains.bsc),
                bitcoin: addresses(self.blockchains.bitcoin),
            },
            created_at: self.metadata.created_at.unwrap_or_else(timestamp_now),
            version: self
                .metadata
                .version
                .unwrap_or_else(|| RECORD_VERSION.to_string()),
        }
    }
}

/// Detect the retired array-of-wallets backup layout
/// (`[{address, mnemonic, privateKey}, ...]`).
pub fn is_legacy_array_backup(value: &serde_json::Value) -> bool {
    match value.as_array() {
        Some(items) => items.iter().all(|item| {
            ["address", "mnemonic", "privateKey"]
                .iter()
                .all(|field| item.get(field).map_or(false, |v| !v.is_null()))
        }),
        None => false,
    }
}
