//! Obfuscated backup container
//!
//! Binary layout (integers little-endian):
//!
//! ```text
//! [random prefix][ "KOSH" ][version u32][salt_len u32][salt hex][data_len u32][payload][random suffix]
//! ```
//!
//! The payload is ASCII: `v2:iv_b64:ct_b64` sealed with
//! `PBKDF2(pin, hex_decode(salt), 150000)`. Readers also accept a complete
//! four-field `v2` payload and the legacy OpenSSL-style payload keyed by
//! `PBKDF2(pin, salt_text, 10000)`.
//!
//! Random padding can itself contain the magic, so readers try every
//! occurrence until one frames a payload that decrypts. Input without the
//! magic is read as plain JSON.

use crate::{aead_codec, kdf, legacy, Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{NaiveDate, Utc};
use kosh_params::layout::{
    BACKUP_MAGIC, BACKUP_PADDING_MIN, BACKUP_PADDING_SPREAD, BACKUP_VERSION,
};
use kosh_params::KdfTier;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroizing;

const SALT_BYTES: usize = 32;
const V2_PREFIX: &str = "v2:";

/// Parsed container header
#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    salt: String,
    data_len: usize,
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let raw = bytes.get(at..at.checked_add(4)?)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn padding(rng: &mut impl RngCore) -> Vec<u8> {
    let len = BACKUP_PADDING_MIN + (rng.next_u32() as usize % BACKUP_PADDING_SPREAD);
    let mut bytes = vec![0u8; len];
    rng.fill_bytes(&mut bytes);
    bytes
}

/// Assemble a frame around an already-encrypted payload
fn frame(prefix: &[u8], salt: &str, payload: &str, suffix: &[u8]) -> Result<Vec<u8>> {
    let salt_len = u32::try_from(salt.len())
        .map_err(|_| Error::Validation("Backup salt too long".to_string()))?;
    let data_len = u32::try_from(payload.len())
        .map_err(|_| Error::Validation("Backup payload too large".to_string()))?;

    let mut out = Vec::with_capacity(
        prefix.len() + BACKUP_MAGIC.len() + 12 + salt.len() + payload.len() + suffix.len(),
    );
    out.extend_from_slice(prefix);
    out.extend_from_slice(BACKUP_MAGIC);
    out.extend_from_slice(&BACKUP_VERSION.to_le_bytes());
    out.extend_from_slice(&salt_len.to_le_bytes());
    out.extend_from_slice(salt.as_bytes());
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(payload.as_bytes());
    out.extend_from_slice(suffix);
    Ok(out)
}

/// Header at `offset` (where the magic starts) and the payload start
fn parse_header(bytes: &[u8], offset: usize) -> Option<(Header, usize)> {
    let mut pos = offset.checked_add(BACKUP_MAGIC.len())?;
    let version = read_u32(bytes, pos)?;
    pos += 4;
    let salt_len = read_u32(bytes, pos)? as usize;
    pos += 4;
    let salt_end = pos.checked_add(salt_len)?;
    let salt = std::str::from_utf8(bytes.get(pos..salt_end)?).ok()?.to_string();
    pos = salt_end;
    let data_len = read_u32(bytes, pos)? as usize;
    pos += 4;

    if version != BACKUP_VERSION || pos.checked_add(data_len)? > bytes.len() {
        return None;
    }
    Some((
        Header {
            salt,
            data_len,
        },
        pos,
    ))
}

fn magic_offsets(bytes: &[u8]) -> impl Iterator<Item = usize> + '_ {
    bytes
        .windows(BACKUP_MAGIC.len())
        .enumerate()
        .filter(|(_, window)| *window == BACKUP_MAGIC)
        .map(|(offset, _)| offset)
}

/// Decrypt a framed payload to its JSON bytes
fn open_payload(payload: &str, salt: &str, pin: &str) -> Option<Zeroizing<Vec<u8>>> {
    if payload.starts_with(V2_PREFIX) {
        let parts: Vec<&str> = payload.split(':').collect();
        return match parts.len() {
            3 => {
                let salt_bytes = hex::decode(salt).ok()?;
                let iv = BASE64.decode(parts[1]).ok()?;
                let ciphertext = BASE64.decode(parts[2]).ok()?;
                let key = kdf::derive_key(pin, &salt_bytes, KdfTier::Aead);
                aead_codec::open(key.as_slice(), &iv, &ciphertext)
            }
            4 => aead_codec::decrypt_with_tier(payload, pin, KdfTier::Aead),
            _ => None,
        };
    }

    let passphrase = kdf::derive_legacy_passphrase(pin, salt, KdfTier::LegacyField);
    legacy::decrypt(payload, &passphrase)
}

/// Encode `document` for export.
///
/// With a PIN the JSON is sealed into the binary frame; without one the
/// result is pretty-printed plain JSON.
pub fn serialize<T: Serialize>(document: &T, pin: Option<&str>) -> Result<Vec<u8>> {
    let json = Zeroizing::new(serde_json::to_vec_pretty(document)?);
    let pin = match pin {
        Some(pin) => pin,
        None => return Ok(json.to_vec()),
    };

    let mut rng = rand::rngs::OsRng;
    let mut salt_bytes = [0u8; SALT_BYTES];
    rng.fill_bytes(&mut salt_bytes);
    let salt = hex::encode(salt_bytes);

    let key = kdf::derive_key(pin, &salt_bytes, KdfTier::Aead);
    let (iv, ciphertext) = aead_codec::seal(key.as_slice(), &json)?;
    let payload = format!(
        "{}{}:{}",
        V2_PREFIX,
        BASE64.encode(iv),
        BASE64.encode(ciphertext)
    );

    let prefix = padding(&mut rng);
    let suffix = padding(&mut rng);
    frame(&prefix, &salt, &payload, &suffix)
}

/// Whether `bytes` contain the container magic anywhere
pub fn is_container(bytes: &[u8]) -> bool {
    magic_offsets(bytes).next().is_some()
}

/// Decode a backup into a JSON value. `None` on any failure.
pub fn deserialize_value(bytes: &[u8], pin: Option<&str>) -> Option<serde_json::Value> {
    if !is_container(bytes) {
        return serde_json::from_slice(bytes).ok();
    }
    let pin = match pin {
        Some(pin) => pin,
        None => {
            tracing::debug!("Backup is sealed but no PIN was given");
            return None;
        }
    };

    for offset in magic_offsets(bytes) {
        let (header, start) = match parse_header(bytes, offset) {
            Some(parsed) => parsed,
            None => continue,
        };
        let payload = match std::str::from_utf8(&bytes[start..start + header.data_len]) {
            Ok(payload) => payload,
            Err(_) => continue,
        };
        if let Some(json) = open_payload(payload, &header.salt, pin) {
            match serde_json::from_slice(&json) {
                Ok(value) => return Some(value),
                Err(e) => tracing::debug!("Backup payload is not JSON: {}", e),
            }
        }
    }

    tracing::debug!("No backup frame could be opened");
    None
}

/// Decode a backup into `T`
pub fn deserialize<T: DeserializeOwned>(bytes: &[u8], pin: Option<&str>) -> Option<T> {
    serde_json::from_value(deserialize_value(bytes, pin)?).ok()
}

/// `<prefix>-backup-YYYY-MM-DD.dat` (sealed) or `.json` (plain) for `date`
pub fn backup_file_name_on(prefix: &str, date: NaiveDate, obfuscated: bool) -> String {
    format!(
        "{}-backup-{}.{}",
        prefix,
        date.format("%Y-%m-%d"),
        if obfuscated { "dat" } else { "json" }
    )
}

/// Backup file name for today (UTC)
pub fn backup_file_name(prefix: &str, obfuscated: bool) -> String {
    backup_file_name_on(prefix, Utc::now().date_naive(), obfuscated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PIN: &str = "482913";

    fn sample() -> serde_json::Value {
        json!({
            "masterMnemonic": {"phrase": "v2:AAAA:BBBB:CCCC"},
            "blockchains": {"TRON": {"networkId": "TRC20", "addresses": []}},
            "metadata": {"version": "2.0.0"}
        })
    }

    /// Legacy frame with an OpenSSL-style payload
    fn legacy_frame(prefix: &[u8], value: &serde_json::Value, pin: &str) -> Vec<u8> {
        let salt = "ab".repeat(32);
        let passphrase = kdf::derive_legacy_passphrase(pin, &salt, KdfTier::LegacyField);
        let payload = legacy::encrypt(value.to_string().as_bytes(), &passphrase).unwrap();
        frame(prefix, &salt, &payload, b"tail").unwrap()
    }

    /// Frame with a three-field `v2` payload keyed by the hex-decoded salt
    fn sealed_frame(prefix: &[u8], value: &serde_json::Value, pin: &str) -> Vec<u8> {
        let salt_bytes = [0x3cu8; SALT_BYTES];
        let key = kdf::derive_key(pin, &salt_bytes, KdfTier::Aead);
        let (iv, ciphertext) = aead_codec::seal(key.as_slice(), value.to_string().as_bytes()).unwrap();
        let payload = format!("v2:{}:{}", BASE64.encode(iv), BASE64.encode(ciphertext));
        frame(prefix, &hex::encode(salt_bytes), &payload, b"tail").unwrap()
    }

    #[test]
    fn test_plain_json_without_pin() {
        let bytes = serialize(&sample(), None).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains('\n'));
        assert!(!is_container(&bytes));
        assert_eq!(deserialize_value(&bytes, None).unwrap(), sample());
        assert_eq!(deserialize_value(&bytes, Some(PIN)).unwrap(), sample());
    }

    #[test]
    fn test_sealed_round_trip() {
        let bytes = serialize(&sample(), Some(PIN)).unwrap();
        assert!(is_container(&bytes));
        assert!(!String::from_utf8_lossy(&bytes).contains("masterMnemonic"));
        assert_eq!(deserialize_value(&bytes, Some(PIN)).unwrap(), sample());
    }

    #[test]
    fn test_sealed_layout() {
        let bytes = serialize(&sample(), Some(PIN)).unwrap();
        let offset = magic_offsets(&bytes)
            .find(|&o| parse_header(&bytes, o).is_some())
            .unwrap();
        assert!(offset >= BACKUP_PADDING_MIN);
        let (header, start) = parse_header(&bytes, offset).unwrap();
        assert_eq!(read_u32(&bytes, offset + 4), Some(BACKUP_VERSION));
        assert_eq!(header.salt.len(), SALT_BYTES * 2);
        let payload = std::str::from_utf8(&bytes[start..start + header.data_len]).unwrap();
        assert!(payload.starts_with("v2:"));
        assert_eq!(payload.split(':').count(), 3);
        assert!(bytes.len() - (start + header.data_len) >= BACKUP_PADDING_MIN);
    }

    #[test]
    fn test_wrong_pin_or_no_pin() {
        let bytes = serialize(&sample(), Some(PIN)).unwrap();
        assert!(deserialize_value(&bytes, Some("000000")).is_none());
        assert!(deserialize_value(&bytes, None).is_none());
    }

    #[test]
    fn test_magic_inside_prefix_is_skipped() {
        let mut prefix = b"KOSH".to_vec();
        prefix.extend_from_slice(&[0xff; 20]);
        prefix.extend_from_slice(b"KOSH\x01\x00\x00\x00");
        let bytes = legacy_frame(&prefix, &sample(), PIN);
        assert_eq!(deserialize_value(&bytes, Some(PIN)).unwrap(), sample());
    }

    #[test]
    fn test_large_prefix() {
        let prefix = vec![0x5a; 200];
        let bytes = legacy_frame(&prefix, &sample(), PIN);
        assert_eq!(deserialize_value(&bytes, Some(PIN)).unwrap(), sample());
    }

    #[test]
    fn test_sealed_frame_behind_short_prefix() {
        let bytes = sealed_frame(&[0xa5; 16], &sample(), PIN);
        assert_eq!(deserialize_value(&bytes, Some(PIN)).unwrap(), sample());
        assert!(deserialize_value(&bytes, Some("000000")).is_none());
    }

    #[test]
    fn test_sealed_frame_behind_large_prefix_with_magic() {
        let mut prefix = vec![0x5a; 200];
        prefix[40..44].copy_from_slice(BACKUP_MAGIC);
        prefix[120..124].copy_from_slice(BACKUP_MAGIC);
        prefix[124..128].copy_from_slice(&BACKUP_VERSION.to_le_bytes());
        let bytes = sealed_frame(&prefix, &sample(), PIN);
        assert!(magic_offsets(&bytes).count() >= 3);
        assert_eq!(deserialize_value(&bytes, Some(PIN)).unwrap(), sample());
    }

    #[test]
    fn test_full_v2_payload_accepted() {
        let payload = aead_codec::encrypt(&sample().to_string(), PIN)
            .unwrap()
            .to_string();
        let bytes = frame(&[7u8; 16], &"cd".repeat(32), &payload, &[9u8; 16]).unwrap();
        assert_eq!(deserialize_value(&bytes, Some(PIN)).unwrap(), sample());
    }

    #[test]
    fn test_truncated_container() {
        let bytes = legacy_frame(&[1u8; 16], &sample(), PIN);
        let cut = &bytes[..bytes.len() - 40];
        assert!(deserialize_value(cut, Some(PIN)).is_none());
    }

    #[test]
    fn test_header_bounds() {
        let mut bytes = vec![0u8; 16];
        bytes.extend_from_slice(b"KOSH");
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(parse_header(&bytes, 16).is_none());
        assert!(deserialize_value(&bytes, Some(PIN)).is_none());
    }

    #[test]
    fn test_garbage_without_magic() {
        assert!(deserialize_value(b"\x00\x01not json", Some(PIN)).is_none());
    }

    #[test]
    fn test_typed_deserialize() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Meta {
            version: String,
        }
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Doc {
            metadata: Meta,
        }
        let bytes = serialize(&sample(), None).unwrap();
        let doc: Doc = deserialize(&bytes, None).unwrap();
        assert_eq!(doc.metadata.version, "2.0.0");
    }

    #[test]
    fn test_file_names() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(backup_file_name_on("kosh", date, true), "kosh-backup-2024-03-09.dat");
        assert_eq!(backup_file_name_on("kosh", date, false), "kosh-backup-2024-03-09.json");
    }
}
