//! Core traits and data types for the decoding pipeline.
use crate::error::DecodeStats;
use crate::measurement_types::{ForcePair, Sample};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The class of hardware a frame came from.
///
/// This is a closed set: adding a device means adding a variant here and handling it
/// in every exhaustive `match` (most importantly `DeviceRouter::route`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    /// Handheld force dynamometer streaming newline-terminated ASCII readings.
    #[serde(rename = "dynamometer")]
    Dynamometer,
    /// Dual-channel force platform, 80 Hz firmware.
    #[serde(rename = "platform-80hz")]
    Platform80Hz,
    /// Dual-channel force platform, 1 kHz firmware.
    #[serde(rename = "platform-1khz")]
    Platform1kHz,
    /// Rotary distance encoder streaming pulse counts.
    #[serde(rename = "encoder")]
    Encoder,
}

impl DeviceType {
    /// All device types, in declaration order.
    pub const ALL: [DeviceType; 4] = [
        DeviceType::Dynamometer,
        DeviceType::Platform80Hz,
        DeviceType::Platform1kHz,
        DeviceType::Encoder,
    ];

    /// Stable name used in configuration, CLI arguments and exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Dynamometer => "dynamometer",
            DeviceType::Platform80Hz => "platform-80hz",
            DeviceType::Platform1kHz => "platform-1khz",
            DeviceType::Encoder => "encoder",
        }
    }

    /// Map the machine id reported by the device firmware.
    ///
    /// Platform firmware reports a single id for both rates; the 80 Hz variant is
    /// returned and the rate is refined per chunk by `PlatformRate::classify`.
    pub fn from_machine_id(id: &str) -> Option<Self> {
        match id.trim() {
            "10" => Some(DeviceType::Dynamometer),
            "11" => Some(DeviceType::Encoder),
            "12" => Some(DeviceType::Platform80Hz),
            _ => None,
        }
    }

    /// Machine id the firmware reports for this device, the inverse of
    /// [`DeviceType::from_machine_id`].
    pub fn machine_id(&self) -> &'static str {
        match self {
            DeviceType::Dynamometer => "10",
            DeviceType::Encoder => "11",
            DeviceType::Platform80Hz | DeviceType::Platform1kHz => "12",
        }
    }

    /// Whether this device produces `ForcePair`s rather than scalar samples.
    pub fn is_platform(&self) -> bool {
        matches!(self, DeviceType::Platform80Hz | DeviceType::Platform1kHz)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a device type name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown device type '{0}'")]
pub struct UnknownDeviceType(pub String);

impl FromStr for DeviceType {
    type Err = UnknownDeviceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        DeviceType::ALL
            .into_iter()
            .find(|d| d.as_str() == name)
            .ok_or(UnknownDeviceType(s.to_string()))
    }
}

/// Payload of one transport notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameData<'a> {
    /// Raw bytes as read from the serial port.
    Bytes(&'a [u8]),
    /// Text as delivered by the wireless channel: either lowercase hex or plain ASCII.
    Text(&'a str),
}

impl FrameData<'_> {
    /// Length of the payload in its own representation (bytes or characters).
    pub fn len(&self) -> usize {
        match self {
            FrameData::Bytes(b) => b.len(),
            FrameData::Text(t) => t.len(),
        }
    }

    /// True when the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One chunk of raw data plus the instant it arrived.
///
/// Owned by the transport; the decoders only borrow it for the duration of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    /// The chunk payload.
    pub data: FrameData<'a>,
    /// Monotonic arrival time in milliseconds.
    pub arrival_ms: u64,
}

impl<'a> RawFrame<'a> {
    /// Frame carrying raw bytes.
    pub fn bytes(data: &'a [u8], arrival_ms: u64) -> Self {
        Self {
            data: FrameData::Bytes(data),
            arrival_ms,
        }
    }

    /// Frame carrying text (hex or ASCII).
    pub fn text(data: &'a str, arrival_ms: u64) -> Self {
        Self {
            data: FrameData::Text(data),
            arrival_ms,
        }
    }
}

/// Device-homogeneous result of routing one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "samples", rename_all = "snake_case")]
pub enum Decoded {
    /// Dynamometer forces or encoder distances.
    Scalars(Vec<Sample>),
    /// Force platform channel pairs.
    Forces(Vec<ForcePair>),
}

impl Decoded {
    /// Number of samples carried.
    pub fn len(&self) -> usize {
        match self {
            Decoded::Scalars(s) => s.len(),
            Decoded::Forces(f) => f.len(),
        }
    }

    /// True when no sample was decoded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The empty result of the same shape a given device would produce.
    pub fn empty_for(device: DeviceType) -> Self {
        if device.is_platform() {
            Decoded::Forces(Vec::new())
        } else {
            Decoded::Scalars(Vec::new())
        }
    }
}

/// Trait for a stateless frame decoder.
///
/// Decoders never fail: anything they cannot make sense of is skipped and accounted
/// for in `stats`.
pub trait FrameDecoder {
    /// The sample type this decoder emits.
    type Output;

    /// Decode every complete reading in `frame`.
    fn decode(&self, frame: &RawFrame<'_>, stats: &mut DecodeStats) -> Vec<Self::Output>;
}
