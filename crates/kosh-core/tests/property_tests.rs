//! Property-based tests for kosh-core
//!
//! Uses proptest to verify invariants across randomized inputs

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use kosh_core::mnemonic::{normalize_phrase, seed_from_words_unchecked};
use kosh_core::{generate_mnemonic, reverse_words, ChainId, ChainRegistry, EncryptedPayload};
use proptest::prelude::*;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate a valid 12-word mnemonic
fn mnemonic_strategy() -> impl Strategy<Value = String> {
    Just(()).prop_map(|_| generate_mnemonic(12).unwrap().to_string())
}

/// Generate chain identifiers
fn chain_strategy() -> impl Strategy<Value = ChainId> {
    prop::sample::select(ChainId::ALL.to_vec())
}

/// Generate account indices
fn index_strategy() -> impl Strategy<Value = u32> {
    0u32..50
}

// ============================================================================
// Key Derivation Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: same mnemonic + path = same account
    #[test]
    fn prop_deterministic_derivation(
        mnemonic in mnemonic_strategy(),
        chain in chain_strategy(),
        index in index_strategy()
    ) {
        let registry = ChainRegistry::with_builtin();
        let service = registry.get(chain).unwrap();
        let path = chain.derivation_path(index);

        let a = service.create_wallet_from_mnemonic(&mnemonic, &path).unwrap();
        let b = service.create_wallet_from_mnemonic(&mnemonic, &path).unwrap();

        prop_assert_eq!(&a.address, &b.address);
        prop_assert_eq!(a.private_key.as_str(), b.private_key.as_str());
    }

    /// Property: every derived address passes its chain's validator
    #[test]
    fn prop_derived_addresses_are_valid(
        mnemonic in mnemonic_strategy(),
        chain in chain_strategy(),
        index in index_strategy()
    ) {
        let registry = ChainRegistry::with_builtin();
        let service = registry.get(chain).unwrap();
        let account = service
            .create_wallet_from_mnemonic(&mnemonic, &chain.derivation_path(index))
            .unwrap();
        prop_assert!(service.is_valid_address(&account.address));
    }

    /// Property: reversed phrases always yield a usable seed
    #[test]
    fn prop_reversed_phrase_derives(mnemonic in mnemonic_strategy()) {
        let reversed = reverse_words(&mnemonic);
        prop_assert!(seed_from_words_unchecked(&reversed).is_ok());
        let round_trip = reverse_words(&reversed);
        let normalized = normalize_phrase(&mnemonic);
        prop_assert_eq!(round_trip.as_str(), normalized.as_str());
    }
}

// ============================================================================
// Payload Format Properties
// ============================================================================

proptest! {
    /// Property: AEAD payloads survive Display -> FromStr unchanged
    #[test]
    fn prop_aead_payload_text_is_stable(
        salt in prop::array::uniform16(any::<u8>()),
        iv in prop::array::uniform12(any::<u8>()),
        ct in prop::collection::vec(any::<u8>(), 16..128)
    ) {
        let text = format!(
            "v2:{}:{}:{}",
            BASE64.encode(salt),
            BASE64.encode(iv),
            BASE64.encode(&ct)
        );
        let payload: EncryptedPayload = text.parse().unwrap();
        prop_assert_eq!(payload.to_string(), text);
    }

    /// Property: arbitrary colon-free text never parses as a payload
    #[test]
    fn prop_single_field_rejected(text in "[a-zA-Z0-9+/=]{0,64}") {
        prop_assert!(text.parse::<EncryptedPayload>().is_err());
    }
}
