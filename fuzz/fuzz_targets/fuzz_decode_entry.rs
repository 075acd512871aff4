#![no_main]

use libfuzzer_sys::fuzz_target;
use scrollkeep_core::position::{decode_entry, encode_entry};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    if raw.len() > 4096 {
        return;
    }

    // Decoding must never panic, and whatever it yields is sanitized.
    let Some(position) = decode_entry(raw) else {
        return;
    };
    assert!(position.x.is_finite() && position.x >= 0.0);
    assert!(position.y.is_finite() && position.y >= 0.0);

    // A decoded entry re-encodes to the same position.
    let encoded = encode_entry(position).expect("sanitized positions always encode");
    assert_eq!(decode_entry(&encoded), Some(position));
});
