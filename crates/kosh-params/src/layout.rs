//! Storage layout constants
//!
//! Key names are chosen to look like ordinary browser/app cache entries.

/// PIN verification record (`salt_hex:hash_hex`)
pub const PIN_RECORD_KEY: &str = "app_sec_config";

/// Generated decoy wallet record
pub const DECOY_RECORD_KEY: &str = "app_temp_cache";

/// Encrypted fragment manifest
pub const MANIFEST_KEY: &str = "app_index_cache";

/// Plaintext record written by early releases; migrated on first unlock
pub const LEGACY_RECORD_KEY: &str = "kosh_wallet";

/// Keys that a fragment sweep must never remove
pub const RESERVED_KEYS: [&str; 2] = [PIN_RECORD_KEY, DECOY_RECORD_KEY];

/// Prefixes for generated fragment and decoy keys
pub const KEY_PREFIXES: [&str; 7] = [
    "app_", "user_", "cache_", "temp_", "session_", "browser_", "config_",
];

/// Suffixes for generated fragment and decoy keys
pub const KEY_SUFFIXES: [&str; 7] = ["data", "cache", "config", "prefs", "storage", "temp", "info"];

/// Length of the random alphanumeric tail on generated keys
pub const KEY_TAIL_LEN: usize = 6;

/// Number of fragments a blob is split into
pub const FRAGMENT_COUNT: usize = 3;

/// Minimum number of decoy entries written per save
pub const MIN_DECOY_ENTRIES: usize = 3;

/// Maximum number of decoy entries written per save
pub const MAX_DECOY_ENTRIES: usize = 7;

/// Manifest password suffix appended to the PIN
pub const MANIFEST_PASSWORD_SUFFIX: &str = "index";

/// Backup container magic
pub const BACKUP_MAGIC: &[u8; 4] = b"KOSH";

/// Backup container format version
pub const BACKUP_VERSION: u32 = 1;

/// Minimum random padding on each side of a backup container
pub const BACKUP_PADDING_MIN: usize = 16;

/// Random padding spread; padding is `MIN + rand % SPREAD` bytes
pub const BACKUP_PADDING_SPREAD: usize = 32;

/// Backup file name prefix
pub const BACKUP_FILE_PREFIX: &str = "kosh";

/// Wallet record format version
pub const RECORD_VERSION: &str = "2.0.0";

/// Fixed passphrase protecting decoy wallet secrets
pub const DECOY_PASSPHRASE: &str = "fake_password";

/// Required PIN length (ASCII digits)
pub const PIN_LENGTH: usize = 6;

/// Minimum wallet password length
pub const MIN_PASSWORD_LEN: usize = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_keys_share_fragment_prefix() {
        // The reserved records live under a sweepable prefix, which is why
        // the sweep must consult RESERVED_KEYS.
        for key in RESERVED_KEYS {
            assert!(KEY_PREFIXES.iter().any(|p| key.starts_with(p)));
        }
    }

    #[test]
    fn test_decoy_bounds() {
        assert!(MIN_DECOY_ENTRIES <= MAX_DECOY_ENTRIES);
        assert_eq!(BACKUP_PADDING_MIN + BACKUP_PADDING_SPREAD - 1, 47);
    }
}
