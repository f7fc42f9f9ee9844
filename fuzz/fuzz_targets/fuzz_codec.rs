//! Fuzz the downlink command codec: decode is total, and re-encoding
//! whatever it produced decodes to the same command.

#![no_main]

use fieldlink::downlink::DownlinkCommand;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let decoded = DownlinkCommand::decode(data);
    let reencoded = decoded.encode();
    assert_eq!(DownlinkCommand::decode(&reencoded), decoded);
});
