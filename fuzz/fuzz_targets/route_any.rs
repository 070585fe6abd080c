//! Fuzz target for router dispatch.
//!
//! Feeds a sequence of arbitrary chunks, each tagged with a device, through one router
//! and checks that timestamps never go backwards.

#![no_main]

use arbitrary::Arbitrary;
use force_daq::core::{Decoded, DeviceType, RawFrame};
use force_daq::DeviceRouter;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Chunk {
    device: u8,
    arrival_ms: u16,
    as_text: bool,
    data: Vec<u8>,
}

fuzz_target!(|chunks: Vec<Chunk>| {
    let mut router = DeviceRouter::default();
    let mut last = 0;

    for chunk in chunks.iter().take(64) {
        let device = DeviceType::ALL[usize::from(chunk.device) % DeviceType::ALL.len()];
        let text = String::from_utf8_lossy(&chunk.data);
        let frame = if chunk.as_text {
            RawFrame::text(&text, u64::from(chunk.arrival_ms))
        } else {
            RawFrame::bytes(&chunk.data, u64::from(chunk.arrival_ms))
        };

        let stamps: Vec<u64> = match router.route(device, &frame) {
            Decoded::Scalars(samples) => samples.iter().map(|s| s.timestamp_ms).collect(),
            Decoded::Forces(pairs) => pairs.iter().map(|p| p.timestamp_ms).collect(),
        };
        for stamp in stamps {
            assert!(stamp >= last);
            last = stamp;
        }
    }
});
