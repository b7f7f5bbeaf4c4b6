//! BIP-32/44 secp256k1 key derivation

use crate::{Error, Result};
use bip32::{DerivationPath, XPrv};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use zeroize::Zeroizing;

/// secp256k1 key pair derived at a BIP-32 path
pub struct Secp256k1Keypair {
    secret: Zeroizing<[u8; 32]>,
    public_uncompressed: [u8; 65],
    public_compressed: [u8; 33],
}

impl Secp256k1Keypair {
    /// Raw 32-byte private scalar
    pub fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret
    }

    /// Private key as lower-case hex, wiped on drop
    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.secret.as_slice()))
    }

    /// SEC1 uncompressed public key (`0x04 || X || Y`)
    pub fn public_uncompressed(&self) -> &[u8; 65] {
        &self.public_uncompressed
    }

    /// SEC1 compressed public key (`0x02/0x03 || X`)
    pub fn public_compressed(&self) -> &[u8; 33] {
        &self.public_compressed
    }
}

impl std::fmt::Debug for Secp256k1Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secp256k1Keypair")
            .field("secret", &"<redacted>")
            .field("public_compressed", &hex::encode(self.public_compressed))
            .finish()
    }
}

/// Derive the key pair at `path` (e.g. `m/44'/60'/0'/0/0`) from a BIP-39 seed
pub fn derive_keypair(seed: &[u8], path: &str) -> Result<Secp256k1Keypair> {
    let derivation_path: DerivationPath = path
        .parse()
        .map_err(|e| Error::InvalidPath(format!("{}: {}", path, e)))?;

    let xprv = XPrv::derive_from_path(seed, &derivation_path)
        .map_err(|e| Error::KeyDerivation(e.to_string()))?;

    let signing_key = xprv.private_key();
    let public_key = k256::PublicKey::from(signing_key.verifying_key());

    let mut secret = Zeroizing::new([0u8; 32]);
    secret.copy_from_slice(&signing_key.to_bytes());

    let uncompressed = public_key.to_encoded_point(false);
    let compressed = public_key.to_encoded_point(true);

    let mut public_uncompressed = [0u8; 65];
    public_uncompressed.copy_from_slice(uncompressed.as_bytes());
    let mut public_compressed = [0u8; 33];
    public_compressed.copy_from_slice(compressed.as_bytes());

    Ok(Secp256k1Keypair {
        secret,
        public_uncompressed,
        public_compressed,
    })
}
