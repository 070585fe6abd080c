//! Custom error types for the application.
//!
//! This module defines the primary error type, `DaqError`, for everything *around* the
//! decoding core: configuration loading, session bookkeeping and export. Using the
//! `thiserror` crate, it provides a centralized and consistent way to handle these
//! failures with the `?` operator.
//!
//! ## What is *not* an error
//!
//! Frame decoding never fails. A chunk that contains garbage, a truncated packet or an
//! implausible reading simply yields fewer samples than bytes received. Those cases are
//! classified by [`DropReason`] and tallied in [`DecodeStats`] so they can be logged and
//! inspected, but they are never surfaced to the caller as an `Err`.
//!
//! ## Error Hierarchy
//!
//! - **`Config`**: Wraps errors from `figment`, typically TOML parse failures or type
//!   mismatches in environment overrides.
//! - **`Configuration`**: Semantic errors in a configuration that parsed fine (e.g. a
//!   negative sample period). These are caught by `DaqConfig::validate`.
//! - **`Io`**: Wraps `std::io::Error` for capture files, session books and exports.
//! - **`Csv`**: CSV export failures (only with the `storage_csv` feature).
//! - **`Storage`**: An export was requested that cannot be written (e.g. sessions from
//!   devices with different column sets in one CSV file).
//! - **`Serialization`**: JSON encoding/decoding of session books and metadata.
//! - **`InvalidMetadata`**: A session was finished with metadata that fails
//!   `SessionMetadata::validate`, such as a blank label.
//! - **`SessionClosed`**: An operation was attempted on a session that already finished
//!   or was cancelled.
//! - **`FeatureNotEnabled`**: The requested functionality was compiled out.

use serde::Serialize;
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

/// Errors raised outside the decode path.
#[derive(Error, Debug)]
pub enum DaqError {
    /// Configuration could not be loaded or deserialized.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration loaded but holds invalid values.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// File or stream I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV export failure.
    #[cfg(feature = "storage_csv")]
    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    /// Export could not be produced from the given sessions.
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session metadata failed validation (e.g. a blank label).
    #[error("Invalid session metadata: {0}")]
    InvalidMetadata(String),

    /// The session has already been finished or cancelled.
    #[error("Session '{0}' is closed")]
    SessionClosed(String),

    /// Functionality excluded at compile time.
    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}

impl From<figment::Error> for DaqError {
    fn from(err: figment::Error) -> Self {
        DaqError::Config(Box::new(err))
    }
}

/// Why a piece of incoming data produced no sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Unparseable bytes or tokens; the scan skipped them and resumed.
    MalformedFrame,
    /// A decoded value beyond the device plausibility bound.
    OutOfRange,
    /// The frame was tagged with a device type the router does not know.
    UnknownDeviceType,
}

/// Running tally of decode outcomes for one router.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    /// Samples (or force pairs) emitted.
    pub emitted: u64,
    /// Tokens or candidate packets that could not be parsed.
    pub malformed: u64,
    /// Values rejected by the outlier filter.
    pub out_of_range: u64,
    /// Frames routed with an unknown device type name.
    pub unknown_device: u64,
}

impl DecodeStats {
    /// Record one dropped unit of input.
    pub fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::MalformedFrame => self.malformed += 1,
            DropReason::OutOfRange => self.out_of_range += 1,
            DropReason::UnknownDeviceType => self.unknown_device += 1,
        }
    }

    /// Total number of drops of any kind.
    pub fn dropped(&self) -> u64 {
        self.malformed + self.out_of_range + self.unknown_device
    }

    /// Fold another tally into this one.
    pub fn merge(&mut self, other: &DecodeStats) {
        self.emitted += other.emitted;
        self.malformed += other.malformed;
        self.out_of_range += other.out_of_range;
        self.unknown_device += other.unknown_device;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_drop_counts_by_reason() {
        let mut stats = DecodeStats::default();
        stats.record_drop(DropReason::MalformedFrame);
        stats.record_drop(DropReason::OutOfRange);
        stats.record_drop(DropReason::OutOfRange);
        stats.record_drop(DropReason::UnknownDeviceType);

        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.out_of_range, 2);
        assert_eq!(stats.unknown_device, 1);
        assert_eq!(stats.dropped(), 4);
    }

    #[test]
    fn test_merge() {
        let mut a = DecodeStats {
            emitted: 3,
            malformed: 1,
            ..Default::default()
        };
        let b = DecodeStats {
            emitted: 2,
            out_of_range: 5,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.emitted, 5);
        assert_eq!(a.malformed, 1);
        assert_eq!(a.out_of_range, 5);
    }

    #[test]
    fn test_session_closed_message() {
        let err = DaqError::SessionClosed("bench press".to_string());
        assert_eq!(err.to_string(), "Session 'bench press' is closed");
    }
}
