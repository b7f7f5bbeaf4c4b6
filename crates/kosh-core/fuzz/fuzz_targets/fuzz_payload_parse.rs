//! Fuzz test for encrypted payload parsing
//!
//! Stored records carry payloads in three text layouts; parsing must never
//! panic and must re-encode what it accepts.

#![no_main]

use kosh_core::EncryptedPayload;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(payload) = s.parse::<EncryptedPayload>() {
            let reparsed = payload.to_string().parse::<EncryptedPayload>();
            assert!(reparsed.ok() == Some(payload));
        }
    }
});
