//! Decoder for the rotary distance encoder.
//!
//! The encoder emits decimal pulse counts, each immediately followed by a terminator
//! character: `3054R-56.7R0.22R`. Legacy firmware terminates with `R`; revised firmware
//! terminates with a newline. Over the wireless link the text may arrive hex-encoded.
//!
//! Tokens are matched left to right without overlap by a regex built from the two
//! configured terminators. Anything that does not fit the
//! `-?digits(.digits)?<terminator>` shape is skipped, and a token still waiting for
//! its terminator at the end of the chunk is discarded.

use crate::core::{FrameData, FrameDecoder, RawFrame};
use crate::decoders::lexer;
use crate::decoders::outlier::OutlierFilter;
use crate::error::{AppResult, DaqError, DecodeStats, DropReason};
use crate::measurement_types::Sample;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::trace;

/// Terminator used by legacy encoder firmware.
pub const LEGACY_TERMINATOR: char = 'R';
/// Terminator used by revised encoder firmware.
pub const REVISED_TERMINATOR: char = '\n';

/// Token pattern for the stock terminators (compiled once).
static DEFAULT_TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    token_regex([LEGACY_TERMINATOR, REVISED_TERMINATOR]).expect("Invalid encoder token regex")
});

/// `-?digits(.digits)?` captured, followed by one of `terminators`.
fn token_regex(terminators: [char; 2]) -> Result<Regex, regex::Error> {
    let [first, second] = terminators.map(|t| regex::escape(&t.to_string()));
    Regex::new(&format!(r"(-?[0-9]+(?:\.[0-9]+)?)(?:{first}|{second})"))
}

/// Terminated-token scanner.
#[derive(Debug, Clone)]
pub struct EncoderDecoder {
    token: Regex,
    filter: OutlierFilter,
}

impl Default for EncoderDecoder {
    fn default() -> Self {
        Self {
            token: DEFAULT_TOKEN_REGEX.clone(),
            filter: OutlierFilter::unbounded(),
        }
    }
}

impl EncoderDecoder {
    /// Decoder accepting the given terminators, with no magnitude ceiling.
    ///
    /// # Errors
    /// Returns [`DaqError::Configuration`] if the token pattern fails to compile.
    pub fn new(terminators: [char; 2]) -> AppResult<Self> {
        let token = token_regex(terminators).map_err(|e| {
            DaqError::Configuration(format!("Invalid encoder terminators {terminators:?}: {e}"))
        })?;
        Ok(Self {
            token,
            filter: OutlierFilter::unbounded(),
        })
    }

    /// Reject values above a magnitude ceiling (used when values are raw pulse counts).
    pub fn with_filter(mut self, filter: OutlierFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Extract every terminated numeric token from already-decoded text.
    pub fn scan(&self, text: &str, timestamp_ms: u64, stats: &mut DecodeStats) -> Vec<Sample> {
        let mut samples = Vec::new();

        for caps in self.token.captures_iter(text) {
            let token = &caps[1];
            match token.parse::<f64>() {
                Ok(value) if self.filter.accepts(value) => {
                    samples.push(Sample::new(value, timestamp_ms));
                    stats.emitted += 1;
                }
                Ok(value) => {
                    trace!(value, "encoder value above ceiling");
                    stats.record_drop(DropReason::OutOfRange);
                }
                Err(_) => {
                    trace!(token, "dropping unparseable encoder token");
                    stats.record_drop(DropReason::MalformedFrame);
                }
            }
        }

        samples
    }
}

impl FrameDecoder for EncoderDecoder {
    type Output = Sample;

    fn decode(&self, frame: &RawFrame<'_>, stats: &mut DecodeStats) -> Vec<Sample> {
        let text: Cow<'_, str> = match frame.data {
            FrameData::Text(text) if !lexer::looks_like_hex(text) => Cow::Borrowed(text),
            _ => Cow::Owned(lexer::ascii_text(&lexer::normalize(&frame.data))),
        };
        self.scan(&text, frame.arrival_ms, stats)
    }
}
