//! Decoder for the handheld force dynamometer.
//!
//! The dynamometer streams ASCII decimal readings terminated by CR, LF or CRLF. Over the
//! wireless link the same text arrives hex-encoded, e.g. `"312e320d0a"` for `"1.2\r\n"`.
//! Interleaved sync/command bytes (`I`, `R`, ...) are dropped as non-numeric tokens.
//!
//! No partial token survives between calls: a reading split across two chunks is
//! flushed at the end of the first chunk if it happens to parse, and is otherwise lost.

use crate::core::{FrameDecoder, RawFrame};
use crate::decoders::lexer;
use crate::decoders::outlier::{OutlierFilter, DYNAMOMETER_MAX_ABS};
use crate::error::{DecodeStats, DropReason};
use crate::measurement_types::Sample;
use tracing::trace;

/// Line-oriented ASCII decoder.
#[derive(Debug, Clone)]
pub struct DynamometerDecoder {
    filter: OutlierFilter,
}

impl Default for DynamometerDecoder {
    fn default() -> Self {
        Self::new(OutlierFilter::new(DYNAMOMETER_MAX_ABS))
    }
}

impl DynamometerDecoder {
    /// Create a decoder with the given plausibility bound.
    pub fn new(filter: OutlierFilter) -> Self {
        Self { filter }
    }

    fn flush(
        &self,
        token: &mut String,
        timestamp_ms: u64,
        out: &mut Vec<Sample>,
        stats: &mut DecodeStats,
    ) {
        let text = token.trim();
        if !text.is_empty() {
            match text.parse::<f64>() {
                Ok(value) if self.filter.accepts(value) => {
                    out.push(Sample::new(value, timestamp_ms));
                    stats.emitted += 1;
                }
                Ok(value) => {
                    trace!(value, "dynamometer reading out of range");
                    stats.record_drop(DropReason::OutOfRange);
                }
                Err(_) => {
                    trace!(token = text, "dropping non-numeric dynamometer token");
                    stats.record_drop(DropReason::MalformedFrame);
                }
            }
        }
        token.clear();
    }
}

impl FrameDecoder for DynamometerDecoder {
    type Output = Sample;

    fn decode(&self, frame: &RawFrame<'_>, stats: &mut DecodeStats) -> Vec<Sample> {
        let bytes = lexer::normalize(&frame.data);
        let mut out = Vec::new();
        let mut token = String::new();

        for &byte in bytes.iter() {
            match byte {
                b'\r' | b'\n' => self.flush(&mut token, frame.arrival_ms, &mut out, stats),
                _ => token.push(byte as char),
            }
        }
        // Unterminated trailing token.
        self.flush(&mut token, frame.arrival_ms, &mut out, stats);

        out
    }
}
