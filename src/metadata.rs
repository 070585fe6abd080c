//! Descriptive metadata attached to every finished session.
//!
//! Metadata is written as the `# `-prefixed header of CSV exports and stored alongside
//! the samples in session books.

use crate::core::DeviceType;
use crate::error::DecodeStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Captures what was measured, with which device, and how decoding went.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionMetadata {
    /// Operator-supplied label for the test.
    pub label: String,
    /// Device the samples were decoded from.
    pub device: DeviceType,
    /// Machine id reported by the firmware, when known.
    pub machine_id: Option<String>,
    /// When recording started.
    pub started_at: DateTime<Utc>,
    /// When the session was finished.
    pub finished_at: Option<DateTime<Utc>>,
    /// Free-form notes.
    pub notes: String,
    /// Decoder and pipeline parameters in effect.
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// Decode outcome counters.
    #[serde(default)]
    pub decode_stats: DecodeStatsSnapshot,
    /// Version of the acquisition software.
    pub software_version: String,
}

/// Serializable copy of [`DecodeStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeStatsSnapshot {
    /// Samples emitted.
    pub emitted: u64,
    /// Malformed tokens or packets.
    pub malformed: u64,
    /// Values rejected as implausible.
    pub out_of_range: u64,
}

impl From<DecodeStats> for DecodeStatsSnapshot {
    fn from(stats: DecodeStats) -> Self {
        Self {
            emitted: stats.emitted,
            malformed: stats.malformed,
            out_of_range: stats.out_of_range,
        }
    }
}

impl SessionMetadata {
    /// Metadata for a session started now.
    pub fn new(device: DeviceType) -> Self {
        Self {
            label: String::new(),
            device,
            machine_id: None,
            started_at: Utc::now(),
            finished_at: None,
            notes: String::new(),
            parameters: BTreeMap::new(),
            decode_stats: DecodeStatsSnapshot::default(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Validates the metadata of a finished session.
    pub fn validate(&self) -> Result<(), String> {
        if self.label.trim().is_empty() {
            return Err("Session label cannot be empty.".to_string());
        }
        if let Some(finished) = self.finished_at {
            if finished < self.started_at {
                return Err("Session finished before it started.".to_string());
            }
        }
        Ok(())
    }
}

/// A builder for constructing `SessionMetadata` instances.
pub struct SessionMetadataBuilder {
    inner: SessionMetadata,
}

impl SessionMetadataBuilder {
    /// Start from fresh metadata for `device`.
    pub fn new(device: DeviceType) -> Self {
        Self {
            inner: SessionMetadata::new(device),
        }
    }

    /// Set the test label.
    pub fn label(mut self, label: &str) -> Self {
        self.inner.label = label.to_string();
        self
    }

    /// Record the firmware machine id.
    pub fn machine_id(mut self, id: &str) -> Self {
        self.inner.machine_id = Some(id.to_string());
        self
    }

    /// Record a pipeline parameter.
    pub fn parameter(mut self, key: &str, value: serde_json::Value) -> Self {
        self.inner.parameters.insert(key.to_string(), value);
        self
    }

    /// Finish building.
    pub fn build(self) -> SessionMetadata {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let metadata = SessionMetadataBuilder::new(DeviceType::Encoder)
            .label("squat 60kg")
            .machine_id("11")
            .parameter("load_kg", json!(60.0))
            .build();

        assert_eq!(metadata.label, "squat 60kg");
        assert_eq!(metadata.device, DeviceType::Encoder);
        assert_eq!(metadata.machine_id.as_deref(), Some("11"));
        assert_eq!(metadata.parameters["load_kg"], json!(60.0));
        assert!(metadata.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_label() {
        let metadata = SessionMetadata::new(DeviceType::Dynamometer);
        assert!(metadata.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_times() {
        let mut metadata = SessionMetadataBuilder::new(DeviceType::Platform80Hz)
            .label("jump")
            .build();
        metadata.finished_at = Some(metadata.started_at - Duration::seconds(5));
        assert!(metadata.validate().is_err());
    }

    #[test]
    fn test_json_uses_device_names() {
        let metadata = SessionMetadataBuilder::new(DeviceType::Platform1kHz)
            .label("cmj")
            .build();
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["device"], "platform-1khz");
        let back: SessionMetadata = serde_json::from_value(value).unwrap();
        assert_eq!(back, metadata);
    }
}
