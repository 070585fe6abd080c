//! Fuzz target for the force platform packet scanner.
//!
//! Checks:
//! - No panic on arbitrary bytes or arbitrary text
//! - Every emitted pair respects the per-channel bound
//! - Emitted plus dropped never exceeds the number of marker positions

#![no_main]

use libfuzzer_sys::fuzz_target;
use force_daq::core::{FrameDecoder, RawFrame};
use force_daq::decoders::PlatformDecoder;
use force_daq::DecodeStats;

fuzz_target!(|data: &[u8]| {
    let decoder = PlatformDecoder::default();

    let mut stats = DecodeStats::default();
    let pairs = decoder.decode(&RawFrame::bytes(data, 0), &mut stats);
    for pair in &pairs {
        assert!(pair.channel1.abs() <= 200.0 && pair.channel2.abs() <= 200.0);
    }
    assert_eq!(stats.emitted as usize, pairs.len());
    assert!(stats.emitted + stats.dropped() <= data.len() as u64);

    let text = String::from_utf8_lossy(data);
    let mut stats = DecodeStats::default();
    let pairs = decoder.decode(&RawFrame::text(&text, 0), &mut stats);
    assert_eq!(stats.emitted as usize, pairs.len());
});
