//! Vault configuration

use crate::Result;
use kosh_core::ChainId;
use kosh_params::layout::{BACKUP_FILE_PREFIX, MIN_PASSWORD_LEN};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Vault configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Leading component of exported backup file names
    pub backup_file_prefix: String,
    /// Chain used when a command names none
    pub default_chain: ChainId,
    /// Minimum wallet password length
    pub min_password_len: usize,
    /// Words in a generated mnemonic
    pub mnemonic_word_count: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("kosh-vault.db"),
            backup_file_prefix: BACKUP_FILE_PREFIX.to_string(),
            default_chain: ChainId::Tron,
            min_password_len: MIN_PASSWORD_LEN,
            mnemonic_word_count: 12,
        }
    }
}

impl VaultConfig {
    /// Read a JSON config file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Read `path` if it exists, otherwise the defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Write as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = VaultConfig::default();
        assert_eq!(config.backup_file_prefix, "kosh");
        assert_eq!(config.default_chain, ChainId::Tron);
        assert_eq!(config.min_password_len, 8);
        assert_eq!(config.mnemonic_word_count, 12);
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vault.json");

        let config = VaultConfig {
            db_path: temp_dir.path().join("vault.db"),
            default_chain: ChainId::Bitcoin,
            mnemonic_word_count: 24,
            ..VaultConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(VaultConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vault.json");
        std::fs::write(&path, r#"{"default_chain":"ETHEREUM"}"#).unwrap();

        let config = VaultConfig::load(&path).unwrap();
        assert_eq!(config.default_chain, ChainId::Ethereum);
        assert_eq!(config.backup_file_prefix, "kosh");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = VaultConfig::load_or_default(&temp_dir.path().join("absent.json")).unwrap();
        assert_eq!(config, VaultConfig::default());
        assert!(VaultConfig::load(&temp_dir.path().join("absent.json")).is_err());
    }
}
