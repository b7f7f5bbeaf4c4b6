//! PIN gate with silent duress fallback
//!
//! Entering the PIN always "succeeds". The correct PIN unlocks the real
//! wallet; anything else (a wrong PIN, an empty PIN, a damaged or missing
//! PIN record) unlocks the decoy wallet instead. Callers observe only the
//! resulting [`VaultMode`], never a rejection.
//!
//! | from | event | to |
//! |---|---|---|
//! | `NoPinSet` | `set_pin` | `UnlockedReal` |
//! | any | `verify_pin`, match | `UnlockedReal` |
//! | any | `verify_pin`, anything else | `UnlockedFake` |
//! | `UnlockedReal` / `UnlockedFake` | `lock_app` | `Locked` (`NoPinSet` if no PIN exists) |
//! | any | `reset_pin` | `NoPinSet` |
//!
//! Whether a PIN exists is tracked apart from the session state, so a
//! session opened before any PIN was configured falls back to `NoPinSet`.

use crate::storage::Storage;
use crate::{kdf, Error, Result};
use kosh_params::layout::{PIN_LENGTH, PIN_RECORD_KEY};
use kosh_params::KdfTier;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use subtle::ConstantTimeEq;

const PIN_SALT_LEN: usize = 16;

/// Gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    /// No PIN configured yet
    #[default]
    NoPinSet,
    /// PIN configured, app locked
    Locked,
    /// Unlocked with the correct PIN
    UnlockedReal,
    /// Unlocked with anything else
    UnlockedFake,
}

/// Which wallet universe an unlocked session sees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultMode {
    /// Real wallet data
    Real,
    /// Decoy wallet data
    Fake,
}

impl GateState {
    /// Session mode; `None` while locked or before a PIN exists
    pub fn mode(self) -> Option<VaultMode> {
        match self {
            GateState::UnlockedReal => Some(VaultMode::Real),
            GateState::UnlockedFake => Some(VaultMode::Fake),
            GateState::NoPinSet | GateState::Locked => None,
        }
    }

    /// Whether the session is unlocked in either mode
    pub fn is_unlocked(self) -> bool {
        self.mode().is_some()
    }
}

/// Persisted PIN verifier: `salt_hex:hash_hex`
#[derive(Clone, PartialEq, Eq)]
pub struct PinRecord {
    salt_hex: String,
    hash_hex: String,
}

impl PinRecord {
    /// Hash `pin` under a fresh salt
    pub fn create(pin: &str) -> Self {
        let mut salt = [0u8; PIN_SALT_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        let salt_hex = hex::encode(salt);
        let hash_hex = kdf::derive_legacy_passphrase(pin, &salt_hex, KdfTier::PinHash);
        Self {
            salt_hex,
            hash_hex: hash_hex.to_string(),
        }
    }

    /// Constant-time check of `candidate`
    pub fn matches(&self, candidate: &str) -> bool {
        let computed = kdf::derive_legacy_passphrase(candidate, &self.salt_hex, KdfTier::PinHash);
        computed.as_bytes().ct_eq(self.hash_hex.as_bytes()).into()
    }
}

impl FromStr for PinRecord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((salt, hash)) if !salt.is_empty() && !hash.is_empty() && !hash.contains(':') => {
                Ok(Self {
                    salt_hex: salt.to_string(),
                    hash_hex: hash.to_string(),
                })
            }
            _ => Err(Error::Validation("Malformed PIN record".to_string())),
        }
    }
}

impl fmt::Display for PinRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.salt_hex, self.hash_hex)
    }
}

impl fmt::Debug for PinRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PinRecord(<redacted>)")
    }
}

/// Check that `pin` is exactly [`PIN_LENGTH`] ASCII digits
pub fn validate_pin(pin: &str) -> Result<()> {
    if pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "PIN must be exactly {} digits",
            PIN_LENGTH
        )))
    }
}

/// PIN state machine over a [`Storage`] backend
pub struct DuressGate {
    storage: Arc<dyn Storage>,
    state: GateState,
    /// Raw stored record as last read; parsed at verification time
    record: Option<String>,
    pin_set: bool,
    fake_activations: u32,
}

impl DuressGate {
    /// Gate in `NoPinSet`; call [`initialize`](Self::initialize) to load state
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            state: GateState::NoPinSet,
            record: None,
            pin_set: false,
            fake_activations: 0,
        }
    }

    /// Load the persisted record.
    ///
    /// A stored record locks the gate. An unreadable store also locks it:
    /// the record stays unknown and every PIN then opens the decoy.
    pub fn initialize(&mut self) {
        match self.storage.get(PIN_RECORD_KEY) {
            Ok(Some(record)) => {
                self.record = Some(record);
                self.pin_set = true;
                self.state = GateState::Locked;
            }
            Ok(None) => {
                self.record = None;
                self.pin_set = false;
                self.state = GateState::NoPinSet;
            }
            Err(e) => {
                tracing::debug!("PIN record unreadable: {}", e);
                self.record = None;
                self.pin_set = true;
                self.state = GateState::Locked;
            }
        }
        tracing::info!("PIN gate initialized (pin set: {})", self.is_pin_set());
    }

    /// Current state
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Session mode, if unlocked
    pub fn mode(&self) -> Option<VaultMode> {
        self.state.mode()
    }

    /// Whether a PIN has been configured
    pub fn is_pin_set(&self) -> bool {
        self.pin_set
    }

    /// Number of decoy unlocks since this gate was created
    pub fn fake_activation_count(&self) -> u32 {
        self.fake_activations
    }

    /// Configure a new PIN.
    ///
    /// Allowed while no PIN exists and from a real session. From a decoy
    /// session over an existing PIN this reports success without touching
    /// storage.
    pub fn set_pin(&mut self, pin: &str) -> Result<()> {
        validate_pin(pin)?;

        if self.pin_set {
            match self.state {
                GateState::UnlockedFake => return Ok(()),
                GateState::Locked | GateState::NoPinSet => {
                    return Err(Error::Validation("Unlock before changing the PIN".to_string()))
                }
                GateState::UnlockedReal => {}
            }
        }

        let record = PinRecord::create(pin).to_string();
        self.storage.set(PIN_RECORD_KEY, &record)?;
        self.record = Some(record);
        self.pin_set = true;
        self.state = GateState::UnlockedReal;
        tracing::info!("PIN configured");
        Ok(())
    }

    /// Verify a PIN candidate. Always returns `true`; inspect
    /// [`mode`](Self::mode) for the outcome.
    pub fn verify_pin(&mut self, candidate: &str) -> bool {
        let real = !candidate.is_empty()
            && self
                .record
                .as_deref()
                .and_then(|raw| raw.parse::<PinRecord>().ok())
                .map_or(false, |record| record.matches(candidate));

        if real {
            self.state = GateState::UnlockedReal;
        } else {
            self.state = GateState::UnlockedFake;
            self.fake_activations = self.fake_activations.saturating_add(1);
        }
        true
    }

    /// Lock an unlocked session
    pub fn lock_app(&mut self) {
        if self.state.is_unlocked() {
            self.state = if self.pin_set {
                GateState::Locked
            } else {
                GateState::NoPinSet
            };
        }
    }

    /// Forget the PIN entirely
    pub fn reset_pin(&mut self) -> Result<()> {
        self.record = None;
        self.pin_set = false;
        self.state = GateState::NoPinSet;
        self.storage.remove(PIN_RECORD_KEY)?;
        tracing::info!("PIN reset");
        Ok(())
    }
}

impl fmt::Debug for DuressGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuressGate")
            .field("pin_set", &self.is_pin_set())
            .field("unlocked", &self.state.is_unlocked())
            .finish_non_exhaustive()
    }
}
