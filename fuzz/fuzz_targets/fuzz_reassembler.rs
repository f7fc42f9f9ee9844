//! Fuzz the streaming frame reassembler with arbitrary byte streams.
//!
//! The first byte picks a chunking stride so the same input also
//! exercises tag markers split across feed calls. The reassembler must
//! never panic, and its accumulator must stay bounded.

#![no_main]

use fieldlink::link::{FrameReassembler, LinkId};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&stride_byte, stream)) = data.split_first() else {
        return;
    };
    let stride = usize::from(stride_byte % 32) + 1;

    let mut tagged = FrameReassembler::tagged(LinkId::Compute);
    let mut lines = FrameReassembler::lines(LinkId::Sensor);

    for chunk in stream.chunks(stride) {
        for block in tagged.feed(chunk) {
            assert!(!block.body.trim().is_empty());
        }
        for block in lines.feed(chunk) {
            assert!(!block.body.contains('\n'));
        }
    }

    // Accumulators stay near the overflow cap no matter the input.
    assert!(tagged.pending() <= 17 * 1024);
    assert!(lines.pending() <= 17 * 1024);

    tagged.reset();
    assert_eq!(tagged.pending(), 0);
});
