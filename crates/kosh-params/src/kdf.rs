//! PBKDF2 work-factor tiers
//!
//! Every stored artifact was produced with a specific iteration count.
//! Tiers are never upgraded implicitly: changing a value here makes
//! existing data unreadable.

use serde::{Deserialize, Serialize};

/// Derived key length used by every tier (256-bit)
pub const KEY_LEN: usize = 32;

/// Key-derivation tier, selected explicitly by each caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KdfTier {
    /// PIN verification hash
    PinHash,
    /// Legacy field payloads and legacy backups
    LegacyField,
    /// Storage fragments and their manifest
    Fragment,
    /// Authenticated field payloads and backup containers
    Aead,
}

impl KdfTier {
    /// PBKDF2-HMAC-SHA256 iteration count for this tier
    pub const fn iterations(self) -> u32 {
        match self {
            KdfTier::PinHash => 5_000,
            KdfTier::LegacyField => 10_000,
            KdfTier::Fragment => 50_000,
            KdfTier::Aead => 150_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_iterations_are_fixed() {
        assert_eq!(KdfTier::PinHash.iterations(), 5000);
        assert_eq!(KdfTier::LegacyField.iterations(), 10000);
        assert_eq!(KdfTier::Fragment.iterations(), 50000);
        assert_eq!(KdfTier::Aead.iterations(), 150000);
    }
}
