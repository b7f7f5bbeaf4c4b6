//! OpenSSL-compatible passphrase encryption (decrypt-mostly)
//!
//! Output layout: base64(`"Salted__"` || salt(8) || AES-256-CBC/PKCS7).
//! Key and IV come from `EVP_BytesToKey(MD5, 1 round)` over the passphrase
//! and the 8-byte salt. There is no integrity protection: a wrong key is
//! only detected when padding or UTF-8 decoding fails, so callers must
//! treat these payloads as untrusted.

use crate::{Error, Result};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use md5::{Digest, Md5};
use rand::RngCore;
use zeroize::Zeroizing;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const SALTED_MAGIC: &[u8; 8] = b"Salted__";
const SALT_LEN: usize = 8;
const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// `EVP_BytesToKey` with MD5 and a single round
fn bytes_to_key(passphrase: &[u8], salt: &[u8]) -> Zeroizing<[u8; KEY_LEN + IV_LEN]> {
    let mut material = Zeroizing::new([0u8; KEY_LEN + IV_LEN]);
    let mut filled = 0;
    let mut previous: Vec<u8> = Vec::new();

    while filled < material.len() {
        let mut hasher = Md5::new();
        hasher.update(&previous);
        hasher.update(passphrase);
        hasher.update(salt);
        let block = hasher.finalize();

        let take = (material.len() - filled).min(block.len());
        material[filled..filled + take].copy_from_slice(&block[..take]);
        filled += take;
        previous = block.to_vec();
    }

    material
}

/// Encrypt `plaintext` under `passphrase` with a fresh random salt
pub fn encrypt(plaintext: &[u8], passphrase: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    encrypt_with_salt(plaintext, passphrase, &salt)
}

fn encrypt_with_salt(plaintext: &[u8], passphrase: &str, salt: &[u8; SALT_LEN]) -> Result<String> {
    let material = bytes_to_key(passphrase.as_bytes(), salt);
    let cipher = Aes256CbcEnc::new_from_slices(&material[..KEY_LEN], &material[KEY_LEN..])
        .map_err(|e| Error::Encryption(e.to_string()))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut out = Vec::with_capacity(SALTED_MAGIC.len() + SALT_LEN + ciphertext.len());
    out.extend_from_slice(SALTED_MAGIC);
    out.extend_from_slice(salt);
    out.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(out))
}

/// Decrypt to raw bytes. `None` on malformed input or bad padding.
pub fn decrypt(encoded: &str, passphrase: &str) -> Option<Zeroizing<Vec<u8>>> {
    let raw = BASE64.decode(encoded.trim()).ok()?;
    if raw.len() < SALTED_MAGIC.len() + SALT_LEN + IV_LEN || &raw[..8] != SALTED_MAGIC {
        return None;
    }
    let salt = &raw[8..8 + SALT_LEN];
    let ciphertext = &raw[8 + SALT_LEN..];
    if ciphertext.len() % IV_LEN != 0 {
        return None;
    }

    let material = bytes_to_key(passphrase.as_bytes(), salt);
    let cipher = Aes256CbcDec::new_from_slices(&material[..KEY_LEN], &material[KEY_LEN..]).ok()?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .ok()
        .map(Zeroizing::new)
}
