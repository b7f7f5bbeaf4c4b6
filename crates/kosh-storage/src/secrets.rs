//! In-memory session secrets.
//!
//! Holds the PIN of the current unlocked session so records can be
//! re-saved under it. Never persisted; wiped on clear and on drop.

use crate::{Error, Result};
use parking_lot::RwLock;
use zeroize::Zeroizing;

/// Session-scoped secret slot
#[derive(Default)]
pub struct SessionSecrets {
    pin: RwLock<Option<Zeroizing<String>>>,
}

impl SessionSecrets {
    /// Empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the session PIN.
    pub fn set(&self, pin: &str) {
        *self.pin.write() = Some(Zeroizing::new(pin.to_string()));
    }

    /// Wipe the session PIN.
    pub fn clear(&self) {
        *self.pin.write() = None;
    }

    /// Check whether a PIN is held.
    pub fn is_set(&self) -> bool {
        self.pin.read().is_some()
    }

    /// Copy of the session PIN.
    pub fn get(&self) -> Result<Zeroizing<String>> {
        self.pin
            .read()
            .as_ref()
            .map(|p| Zeroizing::new(p.to_string()))
            .ok_or_else(|| Error::Security("App is locked".to_string()))
    }
}

impl std::fmt::Debug for SessionSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSecrets")
            .field("set", &self.is_set())
            .finish()
    }
}
