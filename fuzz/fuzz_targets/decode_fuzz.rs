//! Fuzz the payload decoder.
//!
//! Client storage is untrusted text, so `decode` must return an error for
//! anything it cannot read and never panic. The second half seals the raw
//! bytes in a valid envelope so the Arrow IPC reader sees them directly.
//!
//! Run with: cargo +nightly fuzz run decode_fuzz -- -max_total_time=60

#![no_main]

use cinemetrics_codec::{decode, encode, envelope};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = decode(text);
    }

    let sealed = envelope::seal(data);
    if let Ok(table) = decode(&sealed) {
        // Anything that decodes must survive another trip unchanged.
        let again = encode(&table).expect("decoded table re-encodes");
        assert_eq!(decode(again.as_str()).expect("re-encoded table decodes"), table);
    }
});
