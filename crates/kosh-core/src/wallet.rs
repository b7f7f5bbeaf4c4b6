//! Wallet record data model
//!
//! The record is the single canonical description of a wallet: one
//! encrypted master mnemonic plus, per chain, a gapless list of derived
//! address/key pairs. The JSON layout is camelCase with upper-case chain
//! names, and chains missing from stored JSON load as empty lists.

use crate::{payload::EncryptedPayload, ChainId, Error, Result};
use chrono::{SecondsFormat, Utc};
use kosh_params::layout::RECORD_VERSION;
use serde::{Deserialize, Serialize};

/// Encrypted master mnemonic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterMnemonic {
    /// Encrypted phrase
    pub phrase: EncryptedPayload,
}

/// One derived address and its encrypted private key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedKey {
    /// Chain-encoded address
    pub address: String,
    /// Encrypted private key
    pub private_key: EncryptedPayload,
    /// Account index in the derivation path
    pub index: u32,
}

/// Per-chain derived key lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Networks {
    /// TRON keys
    #[serde(rename = "TRON", default)]
    pub tron: Vec<DerivedKey>,
    /// Ethereum keys
    #[serde(rename = "ETHEREUM", default)]
    pub ethereum: Vec<DerivedKey>,
    /// BSC keys
    #[serde(rename = "BSC", default)]
    pub bsc: Vec<DerivedKey>,
    /// Bitcoin keys
    #[serde(rename = "BITCOIN", default)]
    pub bitcoin: Vec<DerivedKey>,
}

impl Networks {
    /// Keys for `chain`
    pub fn get(&self, chain: ChainId) -> &[DerivedKey] {
        match chain {
            ChainId::Tron => &self.tron,
            ChainId::Ethereum => &self.ethereum,
            ChainId::Bsc => &self.bsc,
            ChainId::Bitcoin => &self.bitcoin,
        }
    }

    fn get_mut(&mut self, chain: ChainId) -> &mut Vec<DerivedKey> {
        match chain {
            ChainId::Tron => &mut self.tron,
            ChainId::Ethereum => &mut self.ethereum,
            ChainId::Bsc => &mut self.bsc,
            ChainId::Bitcoin => &mut self.bitcoin,
        }
    }

    /// Iterate chains in record order
    pub fn iter(&self) -> impl Iterator<Item = (ChainId, &[DerivedKey])> {
        ChainId::ALL.into_iter().map(move |chain| (chain, self.get(chain)))
    }

    /// Total number of derived keys
    pub fn total(&self) -> usize {
        self.iter().map(|(_, keys)| keys.len()).sum()
    }
}

/// Canonical wallet record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    /// Encrypted master mnemonic
    pub master_mnemonic: MasterMnemonic,
    /// Derived keys per chain
    #[serde(default)]
    pub networks: Networks,
    /// ISO-8601 creation time
    pub created_at: String,
    /// Record format version
    pub version: String,
}

/// Current time in the record timestamp format (`2024-01-31T12:00:00.000Z`)
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl WalletRecord {
    /// New record with no derived keys
    pub fn new(phrase: EncryptedPayload) -> Self {
        Self {
            master_mnemonic: MasterMnemonic { phrase },
            networks: Networks::default(),
            created_at: timestamp_now(),
            version: RECORD_VERSION.to_string(),
        }
    }

    /// Index the next derived key on `chain` will get
    pub fn next_index(&self, chain: ChainId) -> u32 {
        self.networks.get(chain).len() as u32
    }

    /// Append a derived key at the next index and return that index
    pub fn push_key(
        &mut self,
        chain: ChainId,
        address: String,
        private_key: EncryptedPayload,
    ) -> u32 {
        let index = self.next_index(chain);
        self.networks.get_mut(chain).push(DerivedKey {
            address,
            private_key,
            index,
        });
        index
    }

    /// Find a derived key by address on any chain
    pub fn find_key(&self, address: &str) -> Option<(ChainId, &DerivedKey)> {
        self.networks
            .iter()
            .find_map(|(chain, keys)| keys.iter().find(|k| k.address == address).map(|k| (chain, k)))
    }

    /// Check that every chain's indices are `0..n` in order
    pub fn validate(&self) -> Result<()> {
        for (chain, keys) in self.networks.iter() {
            for (position, key) in keys.iter().enumerate() {
                if key.index as usize != position {
                    return Err(Error::Validation(format!(
                        "{} key at position {} has index {}",
                        chain, position, key.index
                    )));
                }
            }
        }
        Ok(())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
