//! Fuzz test for mnemonic parsing
//!
//! Ensures phrase validation and seed derivation handle arbitrary input

#![no_main]

use kosh_core::mnemonic::{reverse_words, seed_from_words_unchecked};
use kosh_core::validate_mnemonic;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = validate_mnemonic(s);
        // Decoy phrases take the unchecked path
        let _ = seed_from_words_unchecked(&reverse_words(s));
    }
});
