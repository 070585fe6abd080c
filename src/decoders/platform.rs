//! Decoder for the dual-channel force platform.
//!
//! # Wire format
//!
//! Each packet is 6 bytes (12 hex characters):
//!
//! ```text
//! 4c 3a | lo1 hi1 | lo2 hi2
//! marker  channel1  channel2     force = u16::from_le_bytes([lo, hi]) / 10.0
//! ```
//!
//! Under link jitter the hardware also emits packets whose marker reads `3a 02`; those
//! decode identically. The two markers are the complete tolerance policy.
//!
//! The scan advances one byte at a time rather than one packet at a time, so any number
//! of corrupted or missing bytes between packets only costs the packets they overlap.
//!
//! The 80 Hz and 1 kHz firmwares share this format. The only difference is the burst
//! size of a chunk, which [`PlatformRate::classify`] uses to tell them apart.
//!
//! Older firmware streams ASCII lines instead (`"123.45\t67.89"`); text frames that
//! contain a decimal point, tab or comma are routed to [`PlatformDecoder::decode_ascii`].

use crate::core::{FrameData, FrameDecoder, RawFrame};
use crate::decoders::lexer;
use crate::decoders::outlier::{OutlierFilter, PLATFORM_MAX_ABS};
use crate::error::{DecodeStats, DropReason};
use crate::measurement_types::ForcePair;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Canonical packet marker.
pub const MARKER: &str = "4c3a";
/// One-byte-shifted marker emitted under link jitter.
pub const JITTER_MARKER: &str = "3a02";
/// Packet length in hex characters.
pub const PACKET_HEX_LEN: usize = 12;
/// Hex length above which a chunk is treated as a 1 kHz burst.
pub const DEFAULT_1KHZ_HEX_THRESHOLD: usize = 120;

const FORCE_SCALE: f64 = 10.0;

/// Nominal sampling rate of the platform firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformRate {
    /// Standard firmware.
    Hz80,
    /// High-frequency firmware.
    Khz1,
}

impl PlatformRate {
    /// Guess the firmware rate from the hex length of one chunk.
    pub fn classify(hex_len: usize, threshold: usize) -> Self {
        if hex_len > threshold {
            PlatformRate::Khz1
        } else {
            PlatformRate::Hz80
        }
    }

    /// Nominal samples per second.
    pub fn nominal_hz(&self) -> f64 {
        match self {
            PlatformRate::Hz80 => 80.0,
            PlatformRate::Khz1 => 1000.0,
        }
    }
}

/// Packet scanner shared by both platform rates.
#[derive(Debug, Clone)]
pub struct PlatformDecoder {
    filter: OutlierFilter,
}

impl Default for PlatformDecoder {
    fn default() -> Self {
        Self::new(OutlierFilter::new(PLATFORM_MAX_ABS))
    }
}

impl PlatformDecoder {
    /// Create a decoder with the given per-channel bound.
    pub fn new(filter: OutlierFilter) -> Self {
        Self { filter }
    }

    /// Scan a hex string for packets.
    ///
    /// `hex` is expected to be compact lowercase hex; characters that are not hex digits
    /// simply never match a marker or field.
    pub fn decode_hex(&self, hex: &str, timestamp_ms: u64, stats: &mut DecodeStats) -> Vec<ForcePair> {
        let mut pairs = Vec::with_capacity(hex.len() / PACKET_HEX_LEN);
        let mut cursor = 0;

        while cursor + MARKER.len() <= hex.len() {
            let marker = hex.as_bytes().get(cursor..cursor + MARKER.len());
            let is_marker = marker
                .map(|m| m == MARKER.as_bytes() || m == JITTER_MARKER.as_bytes())
                .unwrap_or(false);
            if !is_marker {
                cursor += 2;
                continue;
            }

            match self.decode_packet(hex, cursor, timestamp_ms) {
                Ok(pair) => {
                    pairs.push(pair);
                    stats.emitted += 1;
                    cursor += PACKET_HEX_LEN;
                }
                Err(reason) => {
                    stats.record_drop(reason);
                    cursor += 2;
                }
            }
        }

        pairs
    }

    fn decode_packet(
        &self,
        hex: &str,
        start: usize,
        timestamp_ms: u64,
    ) -> Result<ForcePair, DropReason> {
        if start + PACKET_HEX_LEN > hex.len() {
            trace!(offset = start, "truncated platform packet");
            return Err(DropReason::MalformedFrame);
        }
        let raw1 = lexer::hex_le_u16_at(hex, start + 4).ok_or(DropReason::MalformedFrame)?;
        let raw2 = lexer::hex_le_u16_at(hex, start + 8).ok_or(DropReason::MalformedFrame)?;
        let channel1 = f64::from(raw1) / FORCE_SCALE;
        let channel2 = f64::from(raw2) / FORCE_SCALE;

        if !self.filter.accepts_pair(channel1, channel2) {
            trace!(channel1, channel2, "platform packet out of range");
            return Err(DropReason::OutOfRange);
        }
        Ok(ForcePair::new(channel1, channel2, timestamp_ms))
    }

    /// Decode ASCII lines of two numbers separated by tab, comma or whitespace.
    pub fn decode_ascii(&self, text: &str, timestamp_ms: u64, stats: &mut DecodeStats) -> Vec<ForcePair> {
        let mut pairs = Vec::new();
        for line in text.split(['\r', '\n']) {
            let mut fields = line
                .split(|c: char| c == '\t' || c == ',' || c.is_whitespace())
                .filter(|f| !f.is_empty());
            let (Some(first), Some(second)) = (fields.next(), fields.next()) else {
                if !line.trim().is_empty() {
                    stats.record_drop(DropReason::MalformedFrame);
                }
                continue;
            };
            match (first.parse::<f64>(), second.parse::<f64>()) {
                (Ok(a), Ok(b)) if self.filter.accepts_pair(a, b) => {
                    pairs.push(ForcePair::new(a, b, timestamp_ms));
                    stats.emitted += 1;
                }
                (Ok(_), Ok(_)) => stats.record_drop(DropReason::OutOfRange),
                _ => stats.record_drop(DropReason::MalformedFrame),
            }
        }
        pairs
    }
}

/// True when a text frame carries ASCII readings rather than hex packets.
pub fn is_ascii_reading(text: &str) -> bool {
    text.contains(['.', '\t', ','])
}

impl FrameDecoder for PlatformDecoder {
    type Output = ForcePair;

    fn decode(&self, frame: &RawFrame<'_>, stats: &mut DecodeStats) -> Vec<ForcePair> {
        match frame.data {
            FrameData::Text(text) if is_ascii_reading(text) => {
                self.decode_ascii(text, frame.arrival_ms, stats)
            }
            _ => {
                let hex = lexer::to_hex(&frame.data);
                self.decode_hex(&hex, frame.arrival_ms, stats)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(marker: &str, ch1: u16, ch2: u16) -> String {
        let [l1, h1] = ch1.to_le_bytes();
        let [l2, h2] = ch2.to_le_bytes();
        format!("{marker}{}", hex::encode([l1, h1, l2, h2]))
    }

    #[test]
    fn test_single_canonical_packet() {
        let decoder = PlatformDecoder::default();
        let mut stats = DecodeStats::default();
        let pairs = decoder.decode(&RawFrame::text("4c3a01000200", 7), &mut stats);

        assert_eq!(pairs, vec![ForcePair::new(0.1, 0.2, 7)]);
    }

    #[test]
    fn test_jitter_marker_decodes_identically() {
        let decoder = PlatformDecoder::default();
        let mut stats = DecodeStats::default();
        let canonical = decoder.decode_hex(&packet(MARKER, 1234, 987), 1, &mut stats);
        let jitter = decoder.decode_hex(&packet(JITTER_MARKER, 1234, 987), 1, &mut stats);

        assert_eq!(canonical, jitter);
        assert_eq!(canonical[0].channel1, 123.4);
        assert_eq!(canonical[0].channel2, 98.7);
    }

    #[test]
    fn test_resynchronizes_after_odd_garbage() {
        let decoder = PlatformDecoder::default();
        let mut stats = DecodeStats::default();
        let stream = format!(
            "ff{}000102{}ee",
            packet(MARKER, 10, 20),
            packet(MARKER, 30, 40)
        );
        let pairs = decoder.decode_hex(&stream, 1, &mut stats);

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].channel1, 3.0);
        assert_eq!(pairs[1].channel2, 4.0);
    }

    #[test]
    fn test_outlier_is_local_to_its_packet() {
        let decoder = PlatformDecoder::default();
        let mut stats = DecodeStats::default();
        let stream = format!(
            "{}{}{}",
            packet(MARKER, 100, 100),
            packet(MARKER, 2001, 100),
            packet(MARKER, 200, 2000)
        );
        let pairs = decoder.decode_hex(&stream, 1, &mut stats);

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].channel1, 10.0);
        assert_eq!(pairs[1].channel2, 200.0);
        assert_eq!(stats.out_of_range, 1);
    }

    #[test]
    fn test_truncated_packet_is_dropped() {
        let decoder = PlatformDecoder::default();
        let mut stats = DecodeStats::default();
        let pairs = decoder.decode_hex("4c3a0100", 1, &mut stats);
        assert!(pairs.is_empty());
        assert_eq!(stats.malformed, 1);
    }

    #[test]
    fn test_raw_bytes_and_uppercase_text() {
        let decoder = PlatformDecoder::default();
        let mut stats = DecodeStats::default();
        let from_bytes =
            decoder.decode(&RawFrame::bytes(&[0x4c, 0x3a, 0x0a, 0x00, 0x14, 0x00], 1), &mut stats);
        let from_text = decoder.decode(&RawFrame::text("4C3A 0A00 1400", 1), &mut stats);
        assert_eq!(from_bytes, vec![ForcePair::new(1.0, 2.0, 1)]);
        assert_eq!(from_text, from_bytes);
    }

    #[test]
    fn test_ascii_lines() {
        let decoder = PlatformDecoder::default();
        let mut stats = DecodeStats::default();
        let pairs = decoder.decode(
            &RawFrame::text("123.45\t67.89\r\n1.5,2.5\r\n300.0 1.0\r\nbad\r\n", 3),
            &mut stats,
        );
        assert_eq!(
            pairs,
            vec![ForcePair::new(123.45, 67.89, 3), ForcePair::new(1.5, 2.5, 3)]
        );
        assert_eq!(stats.out_of_range, 1);
        assert_eq!(stats.malformed, 1);
    }

    #[test]
    fn test_rate_classification() {
        assert_eq!(PlatformRate::classify(120, DEFAULT_1KHZ_HEX_THRESHOLD), PlatformRate::Hz80);
        assert_eq!(PlatformRate::classify(132, DEFAULT_1KHZ_HEX_THRESHOLD), PlatformRate::Khz1);
        assert_eq!(PlatformRate::Khz1.nominal_hz(), 1000.0);
    }
}
