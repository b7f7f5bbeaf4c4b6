//! Password-based key derivation (PBKDF2-HMAC-SHA256)
//!
//! Callers always name the [`KdfTier`]; this module never picks a work
//! factor on its own.

use crate::{Error, Result};
use kosh_params::kdf::KEY_LEN;
use kosh_params::KdfTier;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Derive `output_bits` of key material.
///
/// `output_bits` must be a positive multiple of 8 and `iterations` non-zero.
pub fn derive(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_bits: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if output_bits == 0 || output_bits % 8 != 0 {
        return Err(Error::Validation(format!(
            "Key length must be a positive multiple of 8 bits, got {}",
            output_bits
        )));
    }
    if iterations == 0 {
        return Err(Error::Validation("Iteration count must be non-zero".to_string()));
    }

    let mut out = Zeroizing::new(vec![0u8; output_bits / 8]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out);
    Ok(out)
}

/// Derive a 256-bit key at `tier`
pub fn derive_key(password: &str, salt: &[u8], tier: KdfTier) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, tier.iterations(), key.as_mut());
    key
}

/// Lower-case hex of a 256-bit key derived at `tier`, with the hex *text*
/// of the salt as PBKDF2 salt. This is the passphrase string that the
/// legacy OpenSSL-style cipher consumes.
pub fn derive_legacy_passphrase(password: &str, salt_hex: &str, tier: KdfTier) -> Zeroizing<String> {
    let key = derive_key(password, salt_hex.as_bytes(), tier);
    Zeroizing::new(hex::encode(key.as_slice()))
}
