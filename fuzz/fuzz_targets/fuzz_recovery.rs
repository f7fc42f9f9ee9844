//! Fuzz both recovery paths with arbitrary (lossily decoded) text.
//!
//! Recovery is expected to fail often on garbage; it must never panic,
//! and whatever fields come out must carry mapped (lowercase) names.

#![no_main]

use fieldlink::recovery::{lines, object};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    if let Ok(fields) = object::recover(&text) {
        for name in fields.keys() {
            assert!(name.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }

    let fields = lines::parse(&text);
    for name in fields.keys() {
        assert!(!name.is_empty());
    }
});
