//! Fuzz target: `store::decode`
//!
//! Treats the input as a raw EEPROM image.  Decoding must never panic,
//! anything that decodes is in range, and it must encode again and
//! decode to the same document.
//!
//! cargo fuzz run fuzz_config_document

#![no_main]

use aquaguard::store::{decode, encode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(doc) = decode(data) else {
        return;
    };
    assert!(doc.is_valid());
    if let Ok(frame) = encode(&doc) {
        assert_eq!(decode(&frame).ok(), Some(doc));
    }
});
