//! Supported chain definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chain identifier.
///
/// Serialized in upper case (`"TRON"`, `"ETHEREUM"`, `"BSC"`, `"BITCOIN"`) so
/// that stored wallet records and backup documents keep their key names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChainId {
    /// TRON (TRC20 tokens)
    Tron,
    /// Ethereum mainnet (ERC20 tokens)
    Ethereum,
    /// BNB Smart Chain (BEP20 tokens)
    Bsc,
    /// Bitcoin (native segwit)
    Bitcoin,
}

impl ChainId {
    /// All supported chains, in record order
    pub const ALL: [ChainId; 4] = [
        ChainId::Tron,
        ChainId::Ethereum,
        ChainId::Bsc,
        ChainId::Bitcoin,
    ];

    /// Upper-case identifier used in records and backups
    pub const fn as_str(self) -> &'static str {
        match self {
            ChainId::Tron => "TRON",
            ChainId::Ethereum => "ETHEREUM",
            ChainId::Bsc => "BSC",
            ChainId::Bitcoin => "BITCOIN",
        }
    }

    /// BIP-44 coin type
    pub const fn coin_type(self) -> u32 {
        match self {
            ChainId::Tron => 195,
            ChainId::Ethereum => 60,
            ChainId::Bsc => 714,
            ChainId::Bitcoin => 0,
        }
    }

    /// Token standard label carried in backup documents
    pub const fn network_id(self) -> &'static str {
        match self {
            ChainId::Tron => "TRC20",
            ChainId::Ethereum => "ERC20",
            ChainId::Bsc => "BEP20",
            ChainId::Bitcoin => "BTC",
        }
    }

    /// Native currency ticker
    pub const fn currency(self) -> &'static str {
        match self {
            ChainId::Tron => "TRX",
            ChainId::Ethereum => "ETH",
            ChainId::Bsc => "BNB",
            ChainId::Bitcoin => "BTC",
        }
    }

    /// Derivation path prefix up to (not including) the account index,
    /// e.g. `m/44'/195'/`
    pub fn derivation_prefix(self) -> String {
        format!("m/44'/{}'/", self.coin_type())
    }

    /// Full derivation path for address `index`: `m/44'/<coin>'/<index>'/0/0`
    pub fn derivation_path(self, index: u32) -> String {
        format!("m/44'/{}'/{}'/0/0", self.coin_type(), index)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainId {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TRON" | "TRX" => Ok(ChainId::Tron),
            "ETHEREUM" | "ETH" => Ok(ChainId::Ethereum),
            "BSC" | "BNB" => Ok(ChainId::Bsc),
            "BITCOIN" | "BTC" => Ok(ChainId::Bitcoin),
            _ => Err(crate::Error::InvalidChain(s.to_string())),
        }
    }
}
