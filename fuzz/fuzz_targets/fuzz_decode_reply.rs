#![no_main]

use libfuzzer_sys::fuzz_target;
use tracer_rs::tracer::sync::{scan, FrameSynchronizer};
use tracer_rs::decode_reply;

fuzz_target!(|data: &[u8]| {
    // Whole buffer at once
    if let Ok(frame) = scan(data) {
        let _ = decode_reply(&frame);
    }

    // Same bytes split into uneven chunks
    let mut sync = FrameSynchronizer::new();
    for chunk in data.chunks(7) {
        if let Some(frame) = sync.feed(chunk) {
            let _ = decode_reply(&frame);
            break;
        }
    }

    // Raw input as a candidate frame
    let _ = decode_reply(data);
});
