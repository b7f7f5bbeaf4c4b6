//! Wallet vault orchestrator
//!
//! [`WalletVault`] ties the PIN gate, fragmented record storage, decoy
//! wallets and the injected chain services together behind one
//! single-writer handle: every mutation takes `&mut self`.
//!
//! A real session persists its record through the fragment store under the
//! session PIN. A decoy session shows the stored decoy wallet, keeps any
//! changes in memory and never writes to storage.
//!
//! Unlocking a decoy session runs the same key derivations as reading the
//! real record, so the two take comparable time. Storage reads and the
//! decoy JSON parse still differ, so timing is only evened out to the
//! dominant PBKDF2 cost.

use crate::{isolated, Error, Result, VaultConfig};
use kosh_core::backup::is_legacy_array_backup;
use kosh_core::mnemonic::{normalize_phrase, seed_from_words_unchecked};
use kosh_core::{
    generate_mnemonic, validate_mnemonic, BackupDocument, Balance, ChainId, ChainRegistry,
    DerivedKey, SecretString, WalletRecord,
};
use kosh_params::layout::{DECOY_PASSPHRASE, LEGACY_RECORD_KEY};
use kosh_storage::duress::validate_pin;
use kosh_storage::{
    aead_codec, container, DecoyStore, DecoyWalletGenerator, DuressGate, FragmentStore,
    GateState, SessionSecrets, SqliteStorage, Storage, VaultMode,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Exported backup ready to be written to disk
#[derive(Clone, PartialEq, Eq)]
pub struct BackupFile {
    /// File contents
    pub data: Vec<u8>,
    /// Whether `data` is a sealed binary container (otherwise plain JSON)
    pub obfuscated: bool,
    /// Suggested file name
    pub filename: String,
}

impl std::fmt::Debug for BackupFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupFile")
            .field("len", &self.data.len())
            .field("obfuscated", &self.obfuscated)
            .field("filename", &self.filename)
            .finish()
    }
}

/// PIN-gated wallet vault
pub struct WalletVault {
    config: VaultConfig,
    storage: Arc<dyn Storage>,
    gate: DuressGate,
    fragments: FragmentStore,
    decoys: DecoyStore,
    generator: DecoyWalletGenerator,
    chains: ChainRegistry,
    session: SessionSecrets,
    record: Option<WalletRecord>,
    balances: HashMap<String, Balance>,
}

impl WalletVault {
    /// Vault over `storage`, with the PIN gate loaded from it
    pub fn new(storage: Arc<dyn Storage>, chains: ChainRegistry, config: VaultConfig) -> Self {
        let mut gate = DuressGate::new(storage.clone());
        gate.initialize();

        Self {
            config,
            gate,
            fragments: FragmentStore::new(storage.clone()),
            decoys: DecoyStore::new(storage.clone()),
            generator: DecoyWalletGenerator::new(chains.clone()),
            storage,
            chains,
            session: SessionSecrets::new(),
            record: None,
            balances: HashMap::new(),
        }
    }

    /// Vault on the SQLite database named by `config.db_path`
    pub fn open(config: VaultConfig, chains: ChainRegistry) -> Result<Self> {
        let storage = SqliteStorage::open(&config.db_path)?;
        info!("Opened vault database at {}", config.db_path.display());
        Ok(Self::new(Arc::new(storage), chains, config))
    }

    /// Gate state
    pub fn state(&self) -> GateState {
        self.gate.state()
    }

    /// Session mode, if unlocked
    pub fn mode(&self) -> Option<VaultMode> {
        self.gate.mode()
    }

    /// Whether a PIN has been configured
    pub fn is_pin_set(&self) -> bool {
        self.gate.is_pin_set()
    }

    /// Visible wallet record
    pub fn record(&self) -> Option<&WalletRecord> {
        self.record.as_ref()
    }

    /// Last fetched balance of `address`
    pub fn cached_balance(&self, address: &str) -> Option<&Balance> {
        self.balances.get(address)
    }

    /// Active configuration
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // Session lifecycle
    // ---------------------------------------------------------------------

    /// Configure a new PIN.
    ///
    /// From a real session the record is re-sealed under the new PIN: the
    /// new fragments are written first, then the PIN record, and the old
    /// fragments go last. A failure at any step leaves the record readable
    /// under the old PIN. The first PIN also adopts a plaintext record left
    /// by early releases. In a decoy session this succeeds without any
    /// effect.
    pub fn set_pin(&mut self, pin: &str) -> Result<()> {
        let previous = self.gate.state();
        if previous == GateState::UnlockedReal {
            if let Some(record) = &self.record {
                validate_pin(pin)?;
                let current = self.session.get()?;
                let gate = &mut self.gate;
                self.fragments
                    .replace_json(record, pin, &current, || gate.set_pin(pin))?;
                self.session.set(pin);
                info!("PIN changed");
                return Ok(());
            }
        }

        self.gate.set_pin(pin)?;
        if previous == GateState::UnlockedFake {
            return Ok(());
        }

        self.session.set(pin);
        match &self.record {
            Some(record) => {
                self.fragments.clear();
                self.fragments.save_json(record, pin)?;
            }
            None => self.record = self.load_real_record(pin)?,
        }
        Ok(())
    }

    /// Unlock with `pin`. Once a PIN is configured every PIN unlocks; the
    /// returned mode says which wallet is visible.
    pub fn unlock(&mut self, pin: &str) -> Result<VaultMode> {
        if !self.gate.is_pin_set() {
            return Err(Error::Validation("Set a PIN first".to_string()));
        }
        self.gate.verify_pin(pin);
        let mode = self.require_mode()?;
        self.balances.clear();

        match mode {
            VaultMode::Real => {
                self.session.set(pin);
                match self.load_real_record(pin) {
                    Ok(record) => self.record = record,
                    Err(e) => {
                        self.lock();
                        return Err(e);
                    }
                }
            }
            VaultMode::Fake => {
                self.session.clear();
                self.fragments.simulate_load(pin);
                self.record = self.decoys.load();
            }
        }

        info!("Vault unlocked");
        Ok(mode)
    }

    /// Lock and drop every in-memory secret
    pub fn lock(&mut self) {
        self.gate.lock_app();
        self.session.clear();
        self.record = None;
        self.balances.clear();
        info!("Vault locked");
    }

    /// Forget the PIN together with every record sealed under it.
    ///
    /// Requires a real session (or no PIN at all). In a decoy session this
    /// succeeds without any effect.
    pub fn reset_pin(&mut self) -> Result<()> {
        match self.gate.state() {
            GateState::UnlockedFake => return Ok(()),
            GateState::Locked => return Err(Error::Locked),
            GateState::NoPinSet | GateState::UnlockedReal => {}
        }

        self.fragments.clear();
        self.decoys.clear()?;
        self.gate.reset_pin()?;
        self.session.clear();
        self.record = None;
        self.balances.clear();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Wallet operations
    // ---------------------------------------------------------------------

    /// Derive the next address on `chain`, creating the master wallet first
    /// if none exists.
    ///
    /// A new master wallet uses `mnemonic` when given (it must be a valid
    /// BIP-39 phrase) or a freshly generated one.
    pub fn create_wallet(
        &mut self,
        password: &str,
        chain: ChainId,
        mnemonic: Option<&str>,
    ) -> Result<DerivedKey> {
        let mode = self.require_mode()?;
        self.check_password(password)?;
        let secret = Self::sealing_secret(mode, password);

        let mut record = match &self.record {
            Some(record) => record.clone(),
            None => {
                let phrase = match mnemonic {
                    Some(phrase) => {
                        let phrase = normalize_phrase(phrase);
                        if !validate_mnemonic(&phrase) {
                            return Err(Error::Validation("Invalid mnemonic phrase".to_string()));
                        }
                        phrase
                    }
                    None => generate_mnemonic(self.config.mnemonic_word_count)?,
                };
                WalletRecord::new(aead_codec::encrypt(&phrase, secret)?)
            }
        };

        let key = self.append_key(&mut record, chain, secret, mode)?;
        self.commit(record, mode, password)?;
        Ok(key)
    }

    /// Derive the next address on `chain` for the existing wallet
    pub fn add_address(&mut self, password: &str, chain: ChainId) -> Result<DerivedKey> {
        let mode = self.require_mode()?;
        let mut record = self
            .record
            .clone()
            .ok_or_else(|| Error::NotFound("No master wallet found".to_string()))?;
        let secret = Self::sealing_secret(mode, password);

        let key = self.append_key(&mut record, chain, secret, mode)?;
        self.commit(record, mode, password)?;
        Ok(key)
    }

    /// Plaintext private key of `address`
    pub fn decrypt_private_key(&self, address: &str, password: &str) -> Result<SecretString> {
        let mode = self.require_mode()?;
        let record = self.require_record()?;
        let (_, key) = record
            .find_key(address)
            .ok_or_else(|| Error::NotFound(format!("Unknown address {}", address)))?;

        aead_codec::decrypt_payload(&key.private_key, Self::sealing_secret(mode, password))
            .ok_or_else(|| Error::Authentication("Invalid password".to_string()))
    }

    /// Plaintext master mnemonic
    pub fn reveal_mnemonic(&self, password: &str) -> Result<SecretString> {
        let mode = self.require_mode()?;
        let record = self.require_record()?;
        aead_codec::decrypt_payload(
            &record.master_mnemonic.phrase,
            Self::sealing_secret(mode, password),
        )
        .ok_or_else(|| Error::Authentication("Invalid password".to_string()))
    }

    /// Drop the wallet. A real session also erases the stored record and
    /// the decoy wallet.
    pub fn logout(&mut self) -> Result<()> {
        if self.require_mode()? == VaultMode::Real {
            self.fragments.clear();
            self.decoys.clear()?;
        }
        self.record = None;
        self.balances.clear();
        info!("Wallet cleared");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Backups
    // ---------------------------------------------------------------------

    /// Export the visible wallet.
    ///
    /// The result is a sealed container only when a PIN is configured, the
    /// session is real and `pin` is given; otherwise it is plain JSON.
    pub fn export_backup(&self, pin: Option<&str>) -> Result<BackupFile> {
        let mode = self.require_mode()?;
        let record = self
            .record
            .as_ref()
            .ok_or_else(|| Error::NotFound("No wallet to export".to_string()))?;

        let seal_pin = pin.filter(|_| self.gate.is_pin_set() && mode == VaultMode::Real);
        let obfuscated = seal_pin.is_some();
        let document = BackupDocument::from_record(record);
        let data = container::serialize(&document, seal_pin)?;

        info!("Backup exported");
        Ok(BackupFile {
            data,
            obfuscated,
            filename: container::backup_file_name(&self.config.backup_file_prefix, obfuscated),
        })
    }

    /// Replace the visible wallet with a backup's contents.
    ///
    /// Sealed containers are opened off the async runtime. The retired
    /// array-of-wallets layout is rejected.
    pub async fn import_backup(&mut self, data: Vec<u8>, pin: Option<&str>) -> Result<()> {
        let mode = self.require_mode()?;
        let sealed = container::is_container(&data);

        let value = match isolated::open_backup(data, pin.map(str::to_string)).await? {
            Some(value) => value,
            None if sealed => {
                warn!("Backup import rejected: container could not be opened");
                return Err(Error::Authentication(
                    "Failed to decrypt backup - invalid PIN or corrupted file".to_string(),
                ));
            }
            None => {
                warn!("Backup import rejected: not JSON");
                return Err(Error::Format("Invalid backup format".to_string()));
            }
        };

        if is_legacy_array_backup(&value) {
            warn!("Backup import rejected: legacy array layout");
            return Err(Error::Validation(
                "Legacy backup format not supported. Please create a new wallet.".to_string(),
            ));
        }

        let document: BackupDocument = serde_json::from_value(value).map_err(|e| {
            warn!("Backup import rejected: {}", e);
            Error::Format("Invalid backup format".to_string())
        })?;
        let record = document.into_record();
        record.validate()?;

        if mode == VaultMode::Real {
            self.persist(&record)?;
        }
        self.record = Some(record);
        self.balances.clear();
        info!("Backup imported");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Balances
    // ---------------------------------------------------------------------

    /// Balance of `address` on `chain`.
    ///
    /// A decoy session always reports zero without contacting the chain. A
    /// failing chain service also yields zero.
    pub async fn fetch_balance(&mut self, address: &str, chain: ChainId) -> Result<Balance> {
        let balance = match self.require_mode()? {
            VaultMode::Fake => Balance::zero(address, chain),
            VaultMode::Real => self.query_balance(address, chain).await,
        };
        self.balances.insert(address.to_string(), balance.clone());
        Ok(balance)
    }

    /// Balances of every address in the visible wallet, in record order
    pub async fn fetch_all_balances(&mut self) -> Result<Vec<Balance>> {
        let targets: Vec<(String, ChainId)> = self
            .require_record()?
            .networks
            .iter()
            .flat_map(|(chain, keys)| keys.iter().map(move |k| (k.address.clone(), chain)))
            .collect();

        let mut balances = Vec::with_capacity(targets.len());
        for (address, chain) in targets {
            balances.push(self.fetch_balance(&address, chain).await?);
        }
        Ok(balances)
    }

    async fn query_balance(&self, address: &str, chain: ChainId) -> Balance {
        let service = match self.chains.get(chain) {
            Ok(service) => service,
            Err(e) => {
                warn!("Balance unavailable for {}: {}", address, e);
                return Balance::zero(address, chain);
            }
        };
        match service.get_balance(address).await {
            Ok(balance) => balance,
            Err(e) => {
                warn!("Balance unavailable for {}: {}", address, e);
                Balance::zero(address, chain)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn require_mode(&self) -> Result<VaultMode> {
        self.gate.mode().ok_or(Error::Locked)
    }

    fn require_record(&self) -> Result<&WalletRecord> {
        self.record
            .as_ref()
            .ok_or_else(|| Error::NotFound("No master wallet found".to_string()))
    }

    fn check_password(&self, password: &str) -> Result<()> {
        if password.chars().count() < self.config.min_password_len {
            return Err(Error::Validation(format!(
                "Password must be at least {} characters",
                self.config.min_password_len
            )));
        }
        Ok(())
    }

    /// Decoy secrets are sealed under a fixed passphrase whatever the user types
    fn sealing_secret(mode: VaultMode, password: &str) -> &str {
        match mode {
            VaultMode::Real => password,
            VaultMode::Fake => DECOY_PASSPHRASE,
        }
    }

    /// Derive the next key on `chain` into `record`
    fn append_key(
        &self,
        record: &mut WalletRecord,
        chain: ChainId,
        secret: &str,
        mode: VaultMode,
    ) -> Result<DerivedKey> {
        let phrase = aead_codec::decrypt_payload(&record.master_mnemonic.phrase, secret)
            .ok_or_else(|| Error::Authentication("Invalid password".to_string()))?;
        let service = self.chains.get(chain)?;
        let path = chain.derivation_path(record.next_index(chain));

        let account = match mode {
            VaultMode::Real => service.create_wallet_from_mnemonic(&phrase, &path)?,
            // Reversed decoy phrases rarely carry a valid checksum
            VaultMode::Fake => {
                let seed = seed_from_words_unchecked(&phrase)?;
                service.derive_account(seed.as_slice(), &path)?
            }
        };

        let private_key = aead_codec::encrypt(&account.private_key, secret)?;
        record.push_key(chain, account.address, private_key);
        record
            .networks
            .get(chain)
            .last()
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("No {} key after derivation", chain)))
    }

    /// Make `record` visible, persisting it in a real session
    fn commit(&mut self, record: WalletRecord, mode: VaultMode, password: &str) -> Result<()> {
        if mode == VaultMode::Real {
            self.persist(&record)?;
            self.ensure_decoys(&record, password);
        }
        self.record = Some(record);
        Ok(())
    }

    fn persist(&self, record: &WalletRecord) -> Result<()> {
        let pin = self.session.get()?;
        self.fragments.save_json(record, &pin)?;
        Ok(())
    }

    /// Generate the decoy wallet once; failures leave the real wallet untouched
    fn ensure_decoys(&self, record: &WalletRecord, password: &str) {
        if self.decoys.exists() {
            return;
        }
        let outcome = self
            .generator
            .generate(&record.master_mnemonic.phrase, password)
            .and_then(|decoy| self.decoys.save(&decoy));
        if let Err(e) = outcome {
            debug!("Decoy wallet not stored: {}", e);
        }
    }

    /// Stored real record, migrating the plaintext record of early releases
    fn load_real_record(&self, pin: &str) -> Result<Option<WalletRecord>> {
        if self.fragments.has_data() {
            return match self.fragments.load_json::<WalletRecord>(pin) {
                Some(record) => Ok(Some(record)),
                None => Err(Error::Format("Stored wallet could not be read".to_string())),
            };
        }

        let json = match self.storage.get(LEGACY_RECORD_KEY)? {
            Some(json) => json,
            None => return Ok(None),
        };
        let record = WalletRecord::from_json(&json)?;
        record.validate()?;
        self.fragments.save_json(&record, pin)?;
        info!("Migrated plaintext wallet record");
        Ok(Some(record))
    }
}

impl std::fmt::Debug for WalletVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletVault")
            .field("pin_set", &self.gate.is_pin_set())
            .field("unlocked", &self.gate.state().is_unlocked())
            .field("chains", &self.chains)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kosh_storage::MemoryStorage;

    const PIN: &str = "482913";
    const PASSWORD: &str = "Str0ng!Pass";

    fn vault() -> (Arc<MemoryStorage>, WalletVault) {
        let storage = Arc::new(MemoryStorage::new());
        let vault = WalletVault::new(
            storage.clone(),
            ChainRegistry::with_builtin(),
            VaultConfig::default(),
        );
        (storage, vault)
    }

    #[test]
    fn test_locked_vault_rejects_operations() {
        let (_, mut vault) = vault();
        assert_eq!(vault.state(), GateState::NoPinSet);
        assert!(matches!(
            vault.create_wallet(PASSWORD, ChainId::Tron, None),
            Err(Error::Locked)
        ));
        assert!(matches!(vault.export_backup(None), Err(Error::Locked)));
        assert!(matches!(vault.logout(), Err(Error::Locked)));
    }

    #[test]
    fn test_unlock_before_pin_rejected() {
        let (storage, mut vault) = vault();
        let err = vault.unlock(PIN).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(vault.state(), GateState::NoPinSet);
        assert!(matches!(
            vault.create_wallet(PASSWORD, ChainId::Tron, None),
            Err(Error::Locked)
        ));
        assert!(storage.is_empty());

        vault.set_pin(PIN).unwrap();
        assert_eq!(vault.mode(), Some(VaultMode::Real));
        vault.create_wallet(PASSWORD, ChainId::Tron, None).unwrap();
        vault.lock();
        assert_eq!(vault.unlock(PIN).unwrap(), VaultMode::Real);
        assert_eq!(vault.record().unwrap().networks.tron.len(), 1);
    }

    #[test]
    fn test_invalid_new_pin_keeps_record() {
        let (_, mut vault) = vault();
        vault.set_pin(PIN).unwrap();
        vault.create_wallet(PASSWORD, ChainId::Tron, None).unwrap();
        assert!(matches!(
            vault.set_pin("12ab"),
            Err(Error::Storage(kosh_storage::Error::Validation(_)))
        ));

        vault.lock();
        assert_eq!(vault.unlock(PIN).unwrap(), VaultMode::Real);
        assert!(vault.record().is_some());
    }

    #[test]
    fn test_short_password_rejected() {
        let (_, mut vault) = vault();
        vault.set_pin(PIN).unwrap();
        let err = vault.create_wallet("short", ChainId::Tron, None).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(vault.record().is_none());
    }

    #[test]
    fn test_invalid_mnemonic_rejected() {
        let (_, mut vault) = vault();
        vault.set_pin(PIN).unwrap();
        let err = vault
            .create_wallet(PASSWORD, ChainId::Tron, Some("not a real phrase"))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_add_address_requires_wallet() {
        let (_, mut vault) = vault();
        vault.set_pin(PIN).unwrap();
        assert!(matches!(
            vault.add_address(PASSWORD, ChainId::Tron),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_generated_wallet_gets_gapless_indices() {
        let (_, mut vault) = vault();
        vault.set_pin(PIN).unwrap();

        let first = vault.create_wallet(PASSWORD, ChainId::Ethereum, None).unwrap();
        let second = vault.add_address(PASSWORD, ChainId::Ethereum).unwrap();
        assert_eq!((first.index, second.index), (0, 1));
        assert_ne!(first.address, second.address);

        let phrase = vault.reveal_mnemonic(PASSWORD).unwrap();
        assert_eq!(phrase.split_whitespace().count(), 12);
        assert!(matches!(
            vault.add_address("Wrong!Pass1", ChainId::Ethereum),
            Err(Error::Authentication(_))
        ));
    }

    #[test]
    fn test_lock_drops_record() {
        let (_, mut vault) = vault();
        vault.set_pin(PIN).unwrap();
        vault.create_wallet(PASSWORD, ChainId::Tron, None).unwrap();

        vault.lock();
        assert_eq!(vault.state(), GateState::Locked);
        assert!(vault.record().is_none());
        assert!(matches!(vault.reveal_mnemonic(PASSWORD), Err(Error::Locked)));
    }

    #[test]
    fn test_reset_pin_requires_real_session() {
        let (storage, mut vault) = vault();
        vault.set_pin(PIN).unwrap();
        vault.create_wallet(PASSWORD, ChainId::Tron, None).unwrap();
        vault.lock();
        assert!(matches!(vault.reset_pin(), Err(Error::Locked)));

        vault.unlock("000000").unwrap();
        vault.reset_pin().unwrap();
        assert!(vault.is_pin_set());

        vault.lock();
        vault.unlock(PIN).unwrap();
        vault.reset_pin().unwrap();
        assert_eq!(vault.state(), GateState::NoPinSet);
        assert!(storage.is_empty());
    }
}
