//! Fuzz testing for primary-key decoding.
//!
//! Feeds arbitrary byte sequences to `decode_primary` to ensure malformed
//! keys are rejected with errors, never panics, and that anything that does
//! decode is stable: re-encoding and decoding again yields an equal datum.
//! (Byte-identical re-encoding is not expected — the number encoding
//! canonicalizes its readable suffix.)

#![no_main]

use libfuzzer_sys::fuzz_target;

use riverdb_datum::encoding::key::{decode_primary, primary_key};

fuzz_target!(|data: &[u8]| {
    if let Ok(datum) = decode_primary(data) {
        if let Ok(reencoded) = primary_key(&datum) {
            let decoded_again = decode_primary(reencoded.as_bytes())
                .expect("re-encoded key failed to decode");
            assert_eq!(decoded_again, datum, "key decoding is unstable");
        }
    }
});
