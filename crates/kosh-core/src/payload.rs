//! Encrypted field payload formats
//!
//! Three string encodings coexist in stored records:
//!
//! | variant | layout |
//! |---|---|
//! | `LegacySalted` | `salt_hex:openssl_b64` |
//! | `LegacySaltedIv` | `salt_hex:iv_hex:openssl_b64` |
//! | `AeadV2` | `v2:salt_b64:iv_b64:ct_b64` |
//!
//! Only `AeadV2` is ever written. Parsing is structural; whether a payload
//! actually decrypts is decided by the codec in `kosh-storage`.

use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version tag of the authenticated format
pub const AEAD_V2_TAG: &str = "v2";
/// AEAD salt length in bytes
pub const AEAD_SALT_LEN: usize = 16;
/// AES-GCM nonce length in bytes
pub const AEAD_IV_LEN: usize = 12;
/// AES-GCM tag length in bytes
pub const AEAD_TAG_LEN: usize = 16;

/// Encrypted secret as stored in a wallet record
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EncryptedPayload {
    /// PBKDF2 (10000) + OpenSSL-salted AES-CBC, no integrity. Decrypt-only.
    LegacySalted {
        /// PBKDF2 salt, used as its hex text
        salt_hex: String,
        /// base64 `Salted__` ciphertext
        ciphertext: String,
    },
    /// Same as `LegacySalted` with an explicit IV field. Decrypt-only.
    LegacySaltedIv {
        /// PBKDF2 salt, used as its hex text
        salt_hex: String,
        /// IV carried for format compatibility
        iv_hex: String,
        /// base64 `Salted__` ciphertext
        ciphertext: String,
    },
    /// PBKDF2 (150000) + AES-256-GCM
    AeadV2 {
        /// 16-byte PBKDF2 salt
        salt: Vec<u8>,
        /// 12-byte GCM nonce
        iv: Vec<u8>,
        /// ciphertext with appended 16-byte tag
        ciphertext: Vec<u8>,
    },
}

impl EncryptedPayload {
    /// Whether this payload is in the authenticated format
    pub fn is_authenticated(&self) -> bool {
        matches!(self, EncryptedPayload::AeadV2 { .. })
    }

    /// Short format name for logs
    pub fn format_name(&self) -> &'static str {
        match self {
            EncryptedPayload::LegacySalted { .. } => "legacy-salted",
            EncryptedPayload::LegacySaltedIv { .. } => "legacy-salted-iv",
            EncryptedPayload::AeadV2 { .. } => "aead-v2",
        }
    }
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn decode_b64(field: &str, value: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|e| Error::Format(format!("{} is not base64: {}", field, e)))
}

impl FromStr for EncryptedPayload {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [tag, salt, iv, ct] if *tag == AEAD_V2_TAG => {
                let salt = decode_b64("salt", salt)?;
                let iv = decode_b64("iv", iv)?;
                let ciphertext = decode_b64("ciphertext", ct)?;
                if salt.len() != AEAD_SALT_LEN {
                    return Err(Error::Format(format!("salt must be {} bytes", AEAD_SALT_LEN)));
                }
                if iv.len() != AEAD_IV_LEN {
                    return Err(Error::Format(format!("iv must be {} bytes", AEAD_IV_LEN)));
                }
                if ciphertext.len() < AEAD_TAG_LEN {
                    return Err(Error::Format("ciphertext shorter than tag".to_string()));
                }
                Ok(EncryptedPayload::AeadV2 { salt, iv, ciphertext })
            }
            [salt, iv, ct] if is_hex(salt) && is_hex(iv) && !ct.is_empty() => {
                Ok(EncryptedPayload::LegacySaltedIv {
                    salt_hex: salt.to_string(),
                    iv_hex: iv.to_string(),
                    ciphertext: ct.to_string(),
                })
            }
            [salt, ct] if is_hex(salt) && !ct.is_empty() => Ok(EncryptedPayload::LegacySalted {
                salt_hex: salt.to_string(),
                ciphertext: ct.to_string(),
            }),
            _ => Err(Error::Format(format!(
                "unrecognized payload layout ({} fields)",
                parts.len()
            ))),
        }
    }
}

impl fmt::Display for EncryptedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptedPayload::LegacySalted { salt_hex, ciphertext } => {
                write!(f, "{}:{}", salt_hex, ciphertext)
            }
            EncryptedPayload::LegacySaltedIv {
                salt_hex,
                iv_hex,
                ciphertext,
            } => write!(f, "{}:{}:{}", salt_hex, iv_hex, ciphertext),
            EncryptedPayload::AeadV2 { salt, iv, ciphertext } => write!(
                f,
                "{}:{}:{}:{}",
                AEAD_V2_TAG,
                BASE64.encode(salt),
                BASE64.encode(iv),
                BASE64.encode(ciphertext)
            ),
        }
    }
}

impl fmt::Debug for EncryptedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedPayload({})", self.format_name())
    }
}

impl TryFrom<String> for EncryptedPayload {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<EncryptedPayload> for String {
    fn from(payload: EncryptedPayload) -> Self {
        payload.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aead_v2() {
        let s = format!(
            "v2:{}:{}:{}",
            BASE64.encode([1u8; 16]),
            BASE64.encode([2u8; 12]),
            BASE64.encode([3u8; 20])
        );
        let payload: EncryptedPayload = s.parse().unwrap();
        assert!(payload.is_authenticated());
        assert_eq!(payload.to_string(), s);
    }

    #[test]
    fn test_parse_aead_v2_rejects_bad_lengths() {
        let short_salt = format!(
            "v2:{}:{}:{}",
            BASE64.encode([1u8; 8]),
            BASE64.encode([2u8; 12]),
            BASE64.encode([3u8; 20])
        );
        assert!(short_salt.parse::<EncryptedPayload>().is_err());

        let short_ct = format!(
            "v2:{}:{}:{}",
            BASE64.encode([1u8; 16]),
            BASE64.encode([2u8; 12]),
            BASE64.encode([3u8; 4])
        );
        assert!(short_ct.parse::<EncryptedPayload>().is_err());
    }

    #[test]
    fn test_parse_legacy_forms() {
        let two: EncryptedPayload = "a1b2c3:U2FsdGVkX18=".parse().unwrap();
        assert_eq!(two.format_name(), "legacy-salted");

        let three: EncryptedPayload = "a1b2c3:00ff:U2FsdGVkX18=".parse().unwrap();
        assert_eq!(three.format_name(), "legacy-salted-iv");
        assert_eq!(three.to_string(), "a1b2c3:00ff:U2FsdGVkX18=");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<EncryptedPayload>().is_err());
        assert!("fake:empty:mnemonic".parse::<EncryptedPayload>().is_err());
        assert!("v2:only:three".parse::<EncryptedPayload>().is_err());
        assert!("a:b:c:d:e".parse::<EncryptedPayload>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let payload: EncryptedPayload = "a1b2:U2FsdGVkX18=".parse().unwrap();
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, "\"a1b2:U2FsdGVkX18=\"");
        let back: EncryptedPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
        assert!(serde_json::from_str::<EncryptedPayload>("\"nope\"").is_err());
    }

    #[test]
    fn test_debug_hides_material() {
        let payload: EncryptedPayload = "a1b2:U2FsdGVkX18=".parse().unwrap();
        assert_eq!(format!("{:?}", payload), "EncryptedPayload(legacy-salted)");
    }
}
