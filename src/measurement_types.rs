//! Sample types produced by the decoders.
//!
//! Both types carry a millisecond timestamp taken from the arrival instant of the frame
//! they were decoded from. Every sample decoded from one frame shares that timestamp.

use serde::{Deserialize, Serialize};

/// A single scalar reading (dynamometer force or encoder distance).
///
/// # Fields
/// * `value` - Decoded value in device units (force units, or metres for the encoder)
/// * `timestamp_ms` - Arrival instant of the source frame, in milliseconds
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Decoded value
    pub value: f64,
    /// Arrival timestamp in milliseconds
    pub timestamp_ms: u64,
}

impl Sample {
    /// Build a sample.
    pub fn new(value: f64, timestamp_ms: u64) -> Self {
        Self {
            value,
            timestamp_ms,
        }
    }
}

/// A simultaneous reading of both force-platform channels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForcePair {
    /// Left channel force
    pub channel1: f64,
    /// Right channel force
    pub channel2: f64,
    /// Arrival timestamp in milliseconds
    pub timestamp_ms: u64,
}

impl ForcePair {
    /// Build a force pair.
    pub fn new(channel1: f64, channel2: f64, timestamp_ms: u64) -> Self {
        Self {
            channel1,
            channel2,
            timestamp_ms,
        }
    }

    /// Sum of both channels.
    pub fn total(&self) -> f64 {
        self.channel1 + self.channel2
    }
}
