//! BIP-39 mnemonic handling
//!
//! Real wallets always go through checksum validation. The decoy universe
//! is derived from the reversed real phrase, which is made of dictionary
//! words but almost never carries a valid checksum, so seed derivation for
//! it skips the checksum check.

use crate::{Error, Result, SecretString};
use bip39::{Language, Mnemonic};
use rand::RngCore;
use zeroize::Zeroizing;

/// BIP-39 seed (512-bit), wiped on drop
pub type Seed = Zeroizing<[u8; 64]>;

/// Generate a new English mnemonic with `word_count` words.
///
/// Supported counts: 12, 15, 18, 21, 24.
pub fn generate_mnemonic(word_count: usize) -> Result<SecretString> {
    // 12 words = 128 bits, each further 3 words adds 32 bits
    let entropy_size = match word_count {
        12 => 16,
        15 => 20,
        18 => 24,
        21 => 28,
        24 => 32,
        other => {
            return Err(Error::Validation(format!(
                "Unsupported mnemonic length: {} words",
                other
            )))
        }
    };

    let mut entropy = Zeroizing::new(vec![0u8; entropy_size]);
    rand::thread_rng().fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy(&entropy)
        .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;
    Ok(Zeroizing::new(mnemonic.to_string()))
}

/// Validate mnemonic phrase (wordlist and checksum)
pub fn validate_mnemonic(phrase: &str) -> bool {
    Mnemonic::parse_in_normalized(Language::English, phrase).is_ok()
}

/// Normalize whitespace: single spaces, no leading/trailing blanks
pub fn normalize_phrase(phrase: &str) -> SecretString {
    Zeroizing::new(phrase.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Reverse the word order of a phrase
pub fn reverse_words(phrase: &str) -> SecretString {
    let mut words: Vec<&str> = phrase.split_whitespace().collect();
    words.reverse();
    Zeroizing::new(words.join(" "))
}

/// Derive the BIP-39 seed of a checksum-valid phrase (empty passphrase)
pub fn seed_from_mnemonic(phrase: &str) -> Result<Seed> {
    let mnemonic = Mnemonic::parse_in_normalized(Language::English, &normalize_phrase(phrase))
        .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;
    Ok(Zeroizing::new(mnemonic.to_seed("")))
}

/// Derive the BIP-39 seed of a dictionary-word phrase without checksum
/// enforcement (empty passphrase).
pub fn seed_from_words_unchecked(phrase: &str) -> Result<Seed> {
    let mnemonic = Mnemonic::parse_in_normalized_without_checksum_check(
        Language::English,
        &normalize_phrase(phrase),
    )
    .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;
    Ok(Zeroizing::new(mnemonic.to_seed("")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon \
                           abandon abandon abandon abandon abandon about";

    #[test]
    fn test_generate_mnemonic_word_counts() {
        for count in [12, 15, 18, 21, 24] {
            let phrase = generate_mnemonic(count).unwrap();
            assert_eq!(phrase.split_whitespace().count(), count);
            assert!(validate_mnemonic(&phrase));
        }
    }

    #[test]
    fn test_generate_mnemonic_rejects_odd_length() {
        assert!(generate_mnemonic(13).is_err());
    }

    #[test]
    fn test_validate_mnemonic() {
        assert!(validate_mnemonic(ABANDON));
        assert!(!validate_mnemonic("abandon abandon abandon"));
        assert!(!validate_mnemonic("not a real phrase at all"));
    }

    #[test]
    fn test_reverse_words() {
        assert_eq!(reverse_words("one two  three").as_str(), "three two one");
        let twice = reverse_words(&reverse_words(ABANDON));
        assert_eq!(twice.as_str(), normalize_phrase(ABANDON).as_str());
    }

    #[test]
    fn test_reversed_phrase_has_seed_without_checksum() {
        let reversed = reverse_words(ABANDON);
        assert!(!validate_mnemonic(&reversed));
        let seed = seed_from_words_unchecked(&reversed).unwrap();
        let real = seed_from_mnemonic(ABANDON).unwrap();
        assert_ne!(seed.as_slice(), real.as_slice());
    }

    #[test]
    fn test_unchecked_still_requires_dictionary_words() {
        assert!(seed_from_words_unchecked("abandon abandon notaword").is_err());
    }

    #[test]
    fn test_seed_from_mnemonic_known_vector() {
        let seed = seed_from_mnemonic(ABANDON).unwrap();
        assert_eq!(
            hex::encode(seed.as_slice()),
            "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc1\
             9a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4"
        );
    }
}
