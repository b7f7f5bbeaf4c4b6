//! Field payload codec
//!
//! New secrets are always sealed as [`EncryptedPayload::AeadV2`]
//! (PBKDF2-SHA256 at [`KdfTier::Aead`] + AES-256-GCM). The two legacy
//! OpenSSL-style layouts are still readable so old records keep working.
//!
//! Every decrypt entry point is fail-closed: malformed input, a wrong
//! password, and an authentication failure all collapse to `None` so that
//! callers cannot tell those cases apart.

use crate::{kdf, legacy, Error, Result};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use kosh_core::payload::{AEAD_IV_LEN, AEAD_SALT_LEN};
use kosh_core::{EncryptedPayload, SecretString};
use kosh_params::KdfTier;
use rand::RngCore;
use zeroize::Zeroizing;

/// Seal `plaintext` under a raw 256-bit key with a fresh nonce
pub(crate) fn seal(key: &[u8], plaintext: &[u8]) -> Result<([u8; AEAD_IV_LEN], Vec<u8>)> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| Error::Encryption(e.to_string()))?;

    let mut iv = [0u8; AEAD_IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| Error::Encryption(e.to_string()))?;
    Ok((iv, ciphertext))
}

/// Open a sealed buffer. `None` on any failure.
pub(crate) fn open(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
    if iv.len() != AEAD_IV_LEN {
        return None;
    }
    let cipher = Aes256Gcm::new_from_slice(key).ok()?;
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .ok()
        .map(Zeroizing::new)
}

/// Seal into the `v2` layout with the key derived at `tier`
pub(crate) fn encrypt_with_tier(
    plaintext: &[u8],
    password: &str,
    tier: KdfTier,
) -> Result<EncryptedPayload> {
    let mut salt = [0u8; AEAD_SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);

    let key = kdf::derive_key(password, &salt, tier);
    let (iv, ciphertext) = seal(key.as_slice(), plaintext)?;

    Ok(EncryptedPayload::AeadV2 {
        salt: salt.to_vec(),
        iv: iv.to_vec(),
        ciphertext,
    })
}

/// Open a `v2` string with the key derived at `tier`, returning raw bytes
pub(crate) fn decrypt_with_tier(
    ciphertext: &str,
    password: &str,
    tier: KdfTier,
) -> Option<Zeroizing<Vec<u8>>> {
    match ciphertext.parse::<EncryptedPayload>().ok()? {
        EncryptedPayload::AeadV2 {
            salt,
            iv,
            ciphertext,
        } => {
            let key = kdf::derive_key(password, &salt, tier);
            open(key.as_slice(), &iv, &ciphertext)
        }
        _ => None,
    }
}

/// UTF-8 decode and trim; blank text counts as a failed decryption
fn into_text(bytes: &[u8]) -> Option<SecretString> {
    let text = std::str::from_utf8(bytes).ok()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(Zeroizing::new(text.to_string()))
    }
}

/// Encrypt `plaintext` in the authenticated format
pub fn encrypt(plaintext: &str, password: &str) -> Result<EncryptedPayload> {
    encrypt_with_tier(plaintext.as_bytes(), password, KdfTier::Aead)
}

/// Decrypt an authenticated (`v2:`) payload
pub fn decrypt(ciphertext: &str, password: &str) -> Option<SecretString> {
    let plaintext = decrypt_with_tier(ciphertext, password, KdfTier::Aead)?;
    into_text(&plaintext)
}

/// Decrypt either legacy layout (`salt:ct` or `salt:iv:ct`)
pub fn decrypt_legacy(ciphertext: &str, password: &str) -> Option<SecretString> {
    let (salt_hex, body) = match ciphertext.parse::<EncryptedPayload>().ok()? {
        EncryptedPayload::LegacySalted {
            salt_hex,
            ciphertext,
        } => (salt_hex, ciphertext),
        // The IV field is ignored: the OpenSSL key schedule derives its own
        EncryptedPayload::LegacySaltedIv {
            salt_hex,
            ciphertext,
            ..
        } => (salt_hex, ciphertext),
        EncryptedPayload::AeadV2 { .. } => return None,
    };

    let passphrase = kdf::derive_legacy_passphrase(password, &salt_hex, KdfTier::LegacyField);
    let plaintext = legacy::decrypt(&body, &passphrase)?;
    into_text(&plaintext)
}

/// Try the authenticated format first, then the legacy layouts
pub fn decrypt_any(ciphertext: &str, password: &str) -> Option<SecretString> {
    decrypt(ciphertext, password).or_else(|| decrypt_legacy(ciphertext, password))
}

/// Decrypt an already-parsed payload
pub fn decrypt_payload(payload: &EncryptedPayload, password: &str) -> Option<SecretString> {
    let text = payload.to_string();
    if payload.is_authenticated() {
        decrypt(&text, password)
    } else {
        decrypt_legacy(&text, password)
    }
}

/// Produce the three-field legacy layout.
///
/// Only for migration tooling and tests; nothing in the vault writes it.
pub fn encrypt_legacy(plaintext: &str, password: &str) -> Result<EncryptedPayload> {
    let mut salt = [0u8; 16];
    let mut iv = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    rand::rngs::OsRng.fill_bytes(&mut iv);

    let salt_hex = hex::encode(salt);
    let passphrase = kdf::derive_legacy_passphrase(password, &salt_hex, KdfTier::LegacyField);
    let ciphertext = legacy::encrypt(plaintext.as_bytes(), &passphrase)?;

    Ok(EncryptedPayload::LegacySaltedIv {
        salt_hex,
        iv_hex: hex::encode(iv),
        ciphertext,
    })
}
