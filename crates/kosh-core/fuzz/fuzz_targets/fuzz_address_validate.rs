//! Fuzz test for address validation
//!
//! Ensures every chain's address check handles malformed input gracefully

#![no_main]

use kosh_core::{ChainId, ChainRegistry};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let registry = ChainRegistry::with_builtin();
        for chain in ChainId::ALL {
            if let Ok(service) = registry.get(chain) {
                let _ = service.is_valid_address(s);
            }
        }
    }
});
