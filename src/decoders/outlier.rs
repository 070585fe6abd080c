//! Plausibility bound applied to every decoded value.
use serde::{Deserialize, Serialize};

/// Default bound for dynamometer readings, in force units.
pub const DYNAMOMETER_MAX_ABS: f64 = 1000.0;
/// Default bound for each force platform channel, in force units.
pub const PLATFORM_MAX_ABS: f64 = 200.0;
/// Default bound for raw encoder pulse counts.
pub const ENCODER_MAX_ABS: f64 = 2000.0;

/// Drops values whose magnitude exceeds `max_abs`. Values are never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierFilter {
    /// Largest accepted magnitude (inclusive).
    pub max_abs: f64,
}

impl OutlierFilter {
    /// Filter with the given bound.
    pub fn new(max_abs: f64) -> Self {
        Self { max_abs }
    }

    /// Filter that only rejects non-finite values.
    pub fn unbounded() -> Self {
        Self {
            max_abs: f64::INFINITY,
        }
    }

    /// True when `value` is finite and within the bound.
    pub fn accepts(&self, value: f64) -> bool {
        value.is_finite() && value.abs() <= self.max_abs
    }

    /// True when both channels pass.
    pub fn accepts_pair(&self, a: f64, b: f64) -> bool {
        self.accepts(a) && self.accepts(b)
    }
}
