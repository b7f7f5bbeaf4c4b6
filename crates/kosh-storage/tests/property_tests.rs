//! Property-based tests for kosh-storage
//!
//! Uses proptest to verify the encryption and storage invariants across
//! randomized inputs. Case counts stay small because every case pays for
//! at least one full PBKDF2 derivation.

use kosh_storage::{aead_codec, container, DuressGate, FragmentStore, MemoryStorage, VaultMode};
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Printable text without surrounding whitespace
fn message_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9 !@#$%^&*()_+=-]{0,80}[a-zA-Z0-9]"
}

/// Wallet-like passwords
fn password_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9!@#$%]{8,24}"
}

/// Six-digit PINs
fn pin_strategy() -> impl Strategy<Value = String> {
    "[0-9]{6}"
}

/// Arbitrary blobs, including empty-range edge cases
fn blob_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..300)
}

// ============================================================================
// Field Codec Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(6))]

    /// Property: authenticated payloads round-trip
    #[test]
    fn prop_aead_round_trip(message in message_strategy(), password in password_strategy()) {
        let payload = aead_codec::encrypt(&message, &password).unwrap().to_string();
        let plain = aead_codec::decrypt(&payload, &password).unwrap();
        prop_assert_eq!(plain.as_str(), message.as_str());
    }

    /// Property: a different password never opens an authenticated payload
    #[test]
    fn prop_aead_wrong_password(
        message in message_strategy(),
        password in password_strategy(),
        other in password_strategy()
    ) {
        prop_assume!(password != other);
        let payload = aead_codec::encrypt(&message, &password).unwrap().to_string();
        prop_assert!(aead_codec::decrypt(&payload, &other).is_none());
    }

    /// Property: format dispatch recovers legacy payloads too
    #[test]
    fn prop_decrypt_any_reads_legacy(message in message_strategy(), password in password_strategy()) {
        let payload = aead_codec::encrypt_legacy(&message, &password).unwrap().to_string();
        let plain = aead_codec::decrypt_any(&payload, &password).unwrap();
        prop_assert_eq!(plain.as_str(), message.as_str());
    }
}

// ============================================================================
// Storage Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(4))]

    /// Property: fragments reassemble byte-for-byte
    #[test]
    fn prop_fragment_round_trip(blob in blob_strategy(), pin in pin_strategy()) {
        let fragments = FragmentStore::new(Arc::new(MemoryStorage::new()));
        fragments.save(&blob, &pin).unwrap();
        let loaded = fragments.load(&pin).unwrap();
        prop_assert_eq!(loaded.as_slice(), blob.as_slice());
    }

    /// Property: any PIN unlocks; only the correct one is real
    #[test]
    fn prop_duress_indistinguishable(pin in pin_strategy(), candidate in pin_strategy()) {
        let mut gate = DuressGate::new(Arc::new(MemoryStorage::new()));
        gate.initialize();
        gate.set_pin(&pin).unwrap();
        gate.lock_app();

        prop_assert!(gate.verify_pin(&candidate));
        let expected = if candidate == pin { VaultMode::Real } else { VaultMode::Fake };
        prop_assert_eq!(gate.mode(), Some(expected));
    }
}

// ============================================================================
// Backup Container Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(3))]

    /// Property: sealed backups open regardless of the random padding drawn
    #[test]
    fn prop_container_round_trip(message in message_strategy(), pin in pin_strategy()) {
        let document = serde_json::json!({ "note": message });
        let sealed = container::serialize(&document, Some(&pin)).unwrap();
        prop_assert!(container::is_container(&sealed));
        let opened = container::deserialize_value(&sealed, Some(&pin)).unwrap();
        prop_assert_eq!(opened, document);
    }
}
