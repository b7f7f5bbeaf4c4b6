//! Per-chain address encoding and validation
//!
//! - Ethereum / BSC: `0x` + EIP-55 checksummed hex of the last 20 bytes of
//!   `keccak256(X || Y)`
//! - TRON: base58check of `0x41 || keccak256(X || Y)[12..]`
//! - Bitcoin: bech32 P2WPKH of `ripemd160(sha256(compressed pubkey))`

use bech32::{hrp, segwit};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

/// TRON mainnet address prefix byte
pub const TRON_ADDRESS_PREFIX: u8 = 0x41;

/// Bitcoin legacy P2PKH version byte
const BTC_P2PKH_VERSION: u8 = 0x00;
/// Bitcoin legacy P2SH version byte
const BTC_P2SH_VERSION: u8 = 0x05;

/// Keccak-256 digest
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// `ripemd160(sha256(data))`
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let mut hasher = Ripemd160::new();
    hasher.update(sha);
    hasher.finalize().into()
}

fn keccak_account_id(public_uncompressed: &[u8; 65]) -> [u8; 20] {
    let hash = keccak256(&public_uncompressed[1..]);
    let mut id = [0u8; 20];
    id.copy_from_slice(&hash[12..]);
    id
}

/// Apply the EIP-55 mixed-case checksum to a 40-hex-digit account id
/// (with or without the `0x` prefix).
pub fn to_checksum_address(hex_address: &str) -> String {
    let lower = hex_address.trim_start_matches("0x").to_ascii_lowercase();
    let checksum = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = checksum[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Ethereum / BSC address from an uncompressed public key
pub fn evm_address(public_uncompressed: &[u8; 65]) -> String {
    to_checksum_address(&hex::encode(keccak_account_id(public_uncompressed)))
}

/// Check `0x` + 40 hex digits (case-insensitive)
pub fn is_valid_evm_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(body) => body.len() == 40 && body.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// TRON base58check address from an uncompressed public key
pub fn tron_address(public_uncompressed: &[u8; 65]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(TRON_ADDRESS_PREFIX);
    payload.extend_from_slice(&keccak_account_id(public_uncompressed));
    bs58::encode(payload).with_check().into_string()
}

/// Check a TRON base58check address (21-byte payload, `0x41` prefix)
pub fn is_valid_tron_address(address: &str) -> bool {
    match bs58::decode(address).with_check(None).into_vec() {
        Ok(payload) => payload.len() == 21 && payload[0] == TRON_ADDRESS_PREFIX,
        Err(_) => false,
    }
}

/// Bitcoin native segwit (P2WPKH, `bc1q...`) address from a compressed public key
pub fn bitcoin_p2wpkh_address(public_compressed: &[u8; 33]) -> crate::Result<String> {
    segwit::encode_v0(hrp::BC, &hash160(public_compressed))
        .map_err(|e| crate::Error::InvalidAddress(e.to_string()))
}

/// Check a mainnet Bitcoin address: segwit (`bc1...`) or legacy base58check
/// P2PKH / P2SH.
pub fn is_valid_bitcoin_address(address: &str) -> bool {
    if let Ok((decoded_hrp, _version, _program)) = segwit::decode(address) {
        return decoded_hrp == hrp::BC;
    }
    match bs58::decode(address).with_check(None).into_vec() {
        Ok(payload) => {
            payload.len() == 21
                && (payload[0] == BTC_P2PKH_VERSION || payload[0] == BTC_P2SH_VERSION)
        }
        Err(_) => false,
    }
}
