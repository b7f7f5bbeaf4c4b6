//! Fragmented, camouflaged blob storage
//!
//! A blob is split into up to [`FRAGMENT_COUNT`] contiguous byte ranges.
//! Each range is encrypted with a key derived from `pin + index` and
//! written under a random, innocuous-looking key. An encrypted manifest at
//! [`MANIFEST_KEY`] lists the fragment keys, and every save also scatters a
//! handful of plaintext decoy entries that look like ordinary app cache.
//!
//! Fragment layout: `index:salt_hex:openssl_b64`.
//!
//! Reads fail closed: a missing, corrupt, or duplicated fragment yields
//! `None`, never a partial blob.

use crate::storage::Storage;
use crate::{aead_codec, kdf, legacy, Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{SecondsFormat, Utc};
use kosh_params::layout::{
    FRAGMENT_COUNT, KEY_PREFIXES, KEY_SUFFIXES, KEY_TAIL_LEN, LEGACY_RECORD_KEY, MANIFEST_KEY,
    MANIFEST_PASSWORD_SUFFIX, MAX_DECOY_ENTRIES, MIN_DECOY_ENTRIES, RESERVED_KEYS,
};
use kosh_params::KdfTier;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use zeroize::Zeroizing;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const FRAGMENT_SALT_LEN: usize = 16;
const MAX_KEY_ATTEMPTS: usize = 64;

/// Encrypted list of fragment keys
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    keys: Vec<String>,
    /// Unix milliseconds of the save
    timestamp: i64,
}

fn random_base36(rng: &mut impl Rng, len: usize) -> String {
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// `{prefix}{suffix}_{tail}` from the fixed word lists
fn camouflage_key(rng: &mut impl Rng) -> String {
    let prefix = KEY_PREFIXES.choose(rng).copied().unwrap_or("app_");
    let suffix = KEY_SUFFIXES.choose(rng).copied().unwrap_or("data");
    format!("{}{}_{}", prefix, suffix, random_base36(rng, KEY_TAIL_LEN))
}

/// One of three plausible app-cache shapes
fn decoy_value(rng: &mut impl Rng) -> serde_json::Value {
    let now = Utc::now();
    let mut noise = [0u8; 12];
    rng.fill_bytes(&mut noise);

    match rng.gen_range(0..3) {
        0 => serde_json::json!({
            "theme": "dark",
            "language": "en",
            "lastUpdate": now.to_rfc3339_opts(SecondsFormat::Millis, true),
            "version": "1.2.3",
        }),
        1 => serde_json::json!({
            "cached_at": now.timestamp_millis(),
            "expires": now.timestamp_millis() + 86_400_000,
            "data": BASE64.encode(noise),
        }),
        _ => serde_json::json!({
            "user_id": random_base36(rng, 11),
            "session_token": BASE64.encode(noise),
            "last_login": now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }),
    }
}

/// Byte ranges of `ceil(len / FRAGMENT_COUNT)`, empty ranges dropped
fn chunk_ranges(len: usize) -> Vec<(usize, std::ops::Range<usize>)> {
    let chunk = (len + FRAGMENT_COUNT - 1) / FRAGMENT_COUNT;
    (0..FRAGMENT_COUNT)
        .map(|i| {
            let start = (i * chunk).min(len);
            let end = (start + chunk).min(len);
            (i, start..end)
        })
        .filter(|(_, range)| !range.is_empty())
        .collect()
}

fn fragment_password(pin: &str, index: usize) -> Zeroizing<String> {
    Zeroizing::new(format!("{}{}", pin, index))
}

fn manifest_password(pin: &str) -> Zeroizing<String> {
    Zeroizing::new(format!("{}{}", pin, MANIFEST_PASSWORD_SUFFIX))
}

fn encrypt_fragment(chunk: &[u8], pin: &str, index: usize) -> Result<String> {
    let mut salt = [0u8; FRAGMENT_SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let salt_hex = hex::encode(salt);

    let passphrase = kdf::derive_legacy_passphrase(
        &fragment_password(pin, index),
        &salt_hex,
        KdfTier::Fragment,
    );
    let ciphertext = legacy::encrypt(chunk, &passphrase)?;
    Ok(format!("{}:{}:{}", index, salt_hex, ciphertext))
}

fn decrypt_fragment(stored: &str, pin: &str) -> Option<(usize, Zeroizing<Vec<u8>>)> {
    let mut parts = stored.splitn(3, ':');
    let index: usize = parts.next()?.parse().ok()?;
    let salt_hex = parts.next()?;
    let ciphertext = parts.next()?;
    if index >= FRAGMENT_COUNT || salt_hex.is_empty() {
        return None;
    }

    let passphrase = kdf::derive_legacy_passphrase(
        &fragment_password(pin, index),
        salt_hex,
        KdfTier::Fragment,
    );
    legacy::decrypt(ciphertext, &passphrase).map(|bytes| (index, bytes))
}

/// Fragmented blob store over any [`Storage`]
#[derive(Clone)]
pub struct FragmentStore {
    storage: Arc<dyn Storage>,
}

impl FragmentStore {
    /// Store fragments in `storage`
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Fresh camouflage key not present in storage or in `taken`
    fn fresh_key(&self, taken: &HashSet<String>) -> Result<String> {
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_KEY_ATTEMPTS {
            let key = camouflage_key(&mut rng);
            if !taken.contains(&key) && !self.storage.contains(&key)? {
                return Ok(key);
            }
        }
        Err(Error::Storage("Could not allocate a free storage key".to_string()))
    }

    /// Split, encrypt and store `blob` under `pin`.
    ///
    /// The fragments of the blob previously stored under `pin` are removed
    /// once the new manifest is in place. A failed save leaves the previous
    /// blob readable.
    pub fn save(&self, blob: &[u8], pin: &str) -> Result<()> {
        self.replace(blob, pin, pin, || Ok(()))
    }

    /// Store `blob` under `pin` in place of the blob stored under
    /// `previous_pin`.
    ///
    /// `commit` runs after the new fragments and manifest are written. If
    /// anything up to and including `commit` fails, the previous manifest is
    /// restored and the new fragments are removed, so the previous blob stays
    /// readable under `previous_pin`. The previous fragments are removed only
    /// after `commit` succeeds.
    pub fn replace<F>(&self, blob: &[u8], pin: &str, previous_pin: &str, commit: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let previous_manifest = self.storage.get(MANIFEST_KEY)?;
        let stale = self
            .read_manifest(previous_pin)
            .map(|manifest| manifest.keys)
            .unwrap_or_default();

        let mut written = Vec::with_capacity(FRAGMENT_COUNT);
        let mut taken: HashSet<String> = stale.iter().cloned().collect();
        let outcome = self
            .write_fragments(blob, pin, &mut taken, &mut written)
            .and_then(|()| commit());
        if let Err(e) = outcome {
            self.roll_back(previous_manifest.as_deref(), &written);
            return Err(e);
        }

        for key in stale.iter().filter(|key| !written.contains(key)) {
            if let Err(e) = self.storage.remove(key) {
                tracing::debug!("Stale fragment removal failed: {}", e);
            }
        }
        if let Err(e) = self.storage.remove(LEGACY_RECORD_KEY) {
            tracing::debug!("Plaintext record removal failed: {}", e);
        }

        self.scatter_decoys(&mut taken);
        tracing::debug!("Stored blob in {} fragments", written.len());
        Ok(())
    }

    /// Write the fragments of `blob` and a manifest naming them.
    /// Keys are pushed to `written` as soon as they hit storage.
    fn write_fragments(
        &self,
        blob: &[u8],
        pin: &str,
        taken: &mut HashSet<String>,
        written: &mut Vec<String>,
    ) -> Result<()> {
        for (index, range) in chunk_ranges(blob.len()) {
            let key = self.fresh_key(taken)?;
            let fragment = encrypt_fragment(&blob[range], pin, index)?;
            self.storage.set(&key, &fragment)?;
            taken.insert(key.clone());
            written.push(key);
        }

        let manifest = Manifest {
            keys: written.clone(),
            timestamp: Utc::now().timestamp_millis(),
        };
        let manifest_json = Zeroizing::new(serde_json::to_vec(&manifest)?);
        let envelope =
            aead_codec::encrypt_with_tier(&manifest_json, &manifest_password(pin), KdfTier::Fragment)?;
        self.storage.set(MANIFEST_KEY, &envelope.to_string())
    }

    /// Put `previous_manifest` back and drop the fragments in `written`
    fn roll_back(&self, previous_manifest: Option<&str>, written: &[String]) {
        let restored = match previous_manifest {
            Some(manifest) => self.storage.set(MANIFEST_KEY, manifest),
            None => self.storage.remove(MANIFEST_KEY),
        };
        if let Err(e) = restored {
            tracing::warn!("Manifest restore failed: {}", e);
        }
        for key in written {
            if let Err(e) = self.storage.remove(key) {
                tracing::debug!("Fragment removal failed: {}", e);
            }
        }
    }

    /// Serialize `value` as JSON and [`replace`](Self::replace) the blob
    /// stored under `previous_pin`
    pub fn replace_json<T, F>(&self, value: &T, pin: &str, previous_pin: &str, commit: F) -> Result<()>
    where
        T: Serialize,
        F: FnOnce() -> Result<()>,
    {
        let json = Zeroizing::new(serde_json::to_vec(value)?);
        self.replace(&json, pin, previous_pin, commit)
    }

    /// Run the key derivations of a [`load`](Self::load) without reading
    /// any stored fragment
    pub fn simulate_load(&self, pin: &str) {
        let salt_hex = hex::encode([0u8; FRAGMENT_SALT_LEN]);
        let _ = kdf::derive_legacy_passphrase(&manifest_password(pin), &salt_hex, KdfTier::Fragment);
        for index in 0..FRAGMENT_COUNT {
            let _ = kdf::derive_legacy_passphrase(
                &fragment_password(pin, index),
                &salt_hex,
                KdfTier::Fragment,
            );
        }
    }

    /// Write 3-7 plaintext cache-looking entries. Failures are ignored.
    fn scatter_decoys(&self, taken: &mut HashSet<String>) {
        let count = rand::thread_rng().gen_range(MIN_DECOY_ENTRIES..=MAX_DECOY_ENTRIES);
        for _ in 0..count {
            let key = match self.fresh_key(taken) {
                Ok(key) => key,
                Err(e) => {
                    tracing::debug!("Skipping decoy entry: {}", e);
                    continue;
                }
            };
            let value = decoy_value(&mut rand::thread_rng());
            if let Err(e) = self.storage.set(&key, &value.to_string()) {
                tracing::debug!("Skipping decoy entry: {}", e);
                continue;
            }
            taken.insert(key);
        }
    }

    fn read_manifest(&self, pin: &str) -> Option<Manifest> {
        let stored = match self.storage.get(MANIFEST_KEY) {
            Ok(Some(stored)) => stored,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!("Manifest read failed: {}", e);
                return None;
            }
        };
        let password = manifest_password(pin);

        let plaintext = aead_codec::decrypt_with_tier(&stored, &password, KdfTier::Fragment)
            .or_else(|| {
                // salt_hex:openssl_b64 from earlier releases
                let (salt_hex, ciphertext) = stored.split_once(':')?;
                let passphrase =
                    kdf::derive_legacy_passphrase(&password, salt_hex, KdfTier::Fragment);
                legacy::decrypt(ciphertext, &passphrase)
            })?;

        serde_json::from_slice(&plaintext).ok()
    }

    /// Reassemble the blob stored under `pin`
    pub fn load(&self, pin: &str) -> Option<Zeroizing<Vec<u8>>> {
        let manifest = self.read_manifest(pin)?;

        let mut fragments: Vec<(usize, Zeroizing<Vec<u8>>)> = Vec::with_capacity(manifest.keys.len());
        for key in &manifest.keys {
            let stored = match self.storage.get(key) {
                Ok(Some(stored)) => stored,
                Ok(None) => {
                    tracing::debug!("Fragment missing");
                    return None;
                }
                Err(e) => {
                    tracing::debug!("Fragment read failed: {}", e);
                    return None;
                }
            };
            fragments.push(decrypt_fragment(&stored, pin)?);
        }

        fragments.sort_by_key(|(index, _)| *index);
        let contiguous = fragments
            .iter()
            .enumerate()
            .all(|(position, (index, _))| position == *index);
        if !contiguous {
            tracing::debug!("Fragment indices are not contiguous");
            return None;
        }

        let total = fragments.iter().map(|(_, bytes)| bytes.len()).sum();
        let mut blob = Zeroizing::new(Vec::with_capacity(total));
        for (_, bytes) in &fragments {
            blob.extend_from_slice(bytes);
        }
        Some(blob)
    }

    /// Serialize `value` as JSON and save it
    pub fn save_json<T: Serialize>(&self, value: &T, pin: &str) -> Result<()> {
        let json = Zeroizing::new(serde_json::to_vec(value)?);
        self.save(&json, pin)
    }

    /// Load and deserialize a JSON blob
    pub fn load_json<T: DeserializeOwned>(&self, pin: &str) -> Option<T> {
        let blob = self.load(pin)?;
        serde_json::from_slice(&blob).ok()
    }

    /// Whether a manifest exists
    pub fn has_data(&self) -> bool {
        matches!(self.storage.get(MANIFEST_KEY), Ok(Some(_)))
    }

    /// Remove the manifest and every camouflaged key except reserved records
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(MANIFEST_KEY) {
            tracing::debug!("Manifest removal failed: {}", e);
        }

        let keys = match self.storage.list_keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::debug!("Key listing failed: {}", e);
                return;
            }
        };

        let mut removed = 0usize;
        for key in keys {
            let swept = KEY_PREFIXES.iter().any(|p| key.starts_with(p))
                && !RESERVED_KEYS.contains(&key.as_str());
            if !swept {
                continue;
            }
            match self.storage.remove(&key) {
                Ok(()) => removed += 1,
                Err(e) => tracing::debug!("Key removal failed: {}", e),
            }
        }
        tracing::debug!("Cleared {} stored entries", removed);
    }
}

impl std::fmt::Debug for FragmentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentStore").finish_non_exhaustive()
    }
}
