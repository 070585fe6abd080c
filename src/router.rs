//! Dispatch from device type to decoder.
//!
//! [`DeviceRouter`] owns one instance of every decoder plus the encoder's
//! [`MotionProcessor`], so a router is scoped to a single acquisition session. The
//! dispatch is an exhaustive `match` over [`DeviceType`]; a frame tagged with a type
//! name the router does not know produces an empty result.
//!
//! Timestamps handed out by one router never go backwards: a frame whose arrival time
//! precedes the previous frame's is stamped with the previous arrival time.

use crate::config::DaqConfig;
use crate::core::{Decoded, DeviceType, FrameData, FrameDecoder, RawFrame};
use crate::data::motion::MotionProcessor;
use crate::decoders::{
    DynamometerDecoder, EncoderDecoder, OutlierFilter, PlatformDecoder, PlatformRate,
};
use crate::error::{AppResult, DecodeStats, DropReason};
use crate::measurement_types::Sample;
use tracing::{debug, warn};

/// Routes raw frames to the matching decoder and accumulates decode statistics.
#[derive(Debug, Clone)]
pub struct DeviceRouter {
    dynamometer: DynamometerDecoder,
    platform: PlatformDecoder,
    encoder: EncoderDecoder,
    motion: MotionProcessor,
    platform_1khz_hex_threshold: usize,
    platform_rate: Option<PlatformRate>,
    last_timestamp_ms: u64,
    stats: DecodeStats,
}

impl Default for DeviceRouter {
    fn default() -> Self {
        let config = DaqConfig::default();
        let encoder = EncoderDecoder::default()
            .with_filter(OutlierFilter::new(config.decoders.encoder_max_abs));
        Self::with_encoder(&config, encoder)
    }
}

impl DeviceRouter {
    /// Build a router, with a fresh motion processor, from configuration.
    ///
    /// # Errors
    /// Returns [`DaqError::Configuration`](crate::error::DaqError::Configuration) if the
    /// encoder terminators cannot be turned into a token pattern.
    pub fn new(config: &DaqConfig) -> AppResult<Self> {
        let d = &config.decoders;
        let encoder = EncoderDecoder::new(d.encoder_terminators)?
            .with_filter(OutlierFilter::new(d.encoder_max_abs));
        Ok(Self::with_encoder(config, encoder))
    }

    fn with_encoder(config: &DaqConfig, encoder: EncoderDecoder) -> Self {
        let d = &config.decoders;
        Self {
            dynamometer: DynamometerDecoder::new(OutlierFilter::new(d.dynamometer_max_abs)),
            platform: PlatformDecoder::new(OutlierFilter::new(d.platform_max_abs)),
            encoder,
            motion: MotionProcessor::new(&config.motion),
            platform_1khz_hex_threshold: d.platform_1khz_hex_threshold,
            platform_rate: None,
            last_timestamp_ms: 0,
            stats: DecodeStats::default(),
        }
    }

    /// Decode one frame from `device`.
    ///
    /// For the encoder, decoded pulse counts are fed to the motion processor and the
    /// distances it published during this call are returned instead of the raw counts.
    pub fn route(&mut self, device: DeviceType, frame: &RawFrame<'_>) -> Decoded {
        let frame = self.stamp(frame);
        let mut stats = DecodeStats::default();

        let decoded = match device {
            DeviceType::Dynamometer => Decoded::Scalars(self.dynamometer.decode(&frame, &mut stats)),
            DeviceType::Platform80Hz | DeviceType::Platform1kHz => {
                self.observe_platform_rate(device, &frame);
                Decoded::Forces(self.platform.decode(&frame, &mut stats))
            }
            DeviceType::Encoder => {
                for pulses in self.encoder.decode(&frame, &mut stats) {
                    self.motion.insert(pulses.value);
                }
                let distances = self
                    .motion
                    .drain_pending()
                    .into_iter()
                    .map(|d| Sample::new(d, frame.arrival_ms))
                    .collect();
                Decoded::Scalars(distances)
            }
        };

        debug!(
            device = %device,
            bytes = frame.data.len(),
            emitted = decoded.len(),
            dropped = stats.dropped(),
            "routed frame"
        );
        self.stats.merge(&stats);
        decoded
    }

    /// Decode one frame tagged with a device type name.
    ///
    /// Unknown names yield an empty result and are counted as
    /// [`DropReason::UnknownDeviceType`].
    pub fn route_named(&mut self, device: &str, frame: &RawFrame<'_>) -> Decoded {
        match device.parse::<DeviceType>() {
            Ok(device) => self.route(device, frame),
            Err(err) => {
                warn!(%err, "ignoring frame");
                self.stats.record_drop(DropReason::UnknownDeviceType);
                Decoded::Scalars(Vec::new())
            }
        }
    }

    fn stamp<'a>(&mut self, frame: &RawFrame<'a>) -> RawFrame<'a> {
        if frame.arrival_ms < self.last_timestamp_ms {
            debug!(
                arrival_ms = frame.arrival_ms,
                last_ms = self.last_timestamp_ms,
                "frame arrived out of order; reusing previous timestamp"
            );
        }
        self.last_timestamp_ms = self.last_timestamp_ms.max(frame.arrival_ms);
        RawFrame {
            arrival_ms: self.last_timestamp_ms,
            ..*frame
        }
    }

    fn observe_platform_rate(&mut self, device: DeviceType, frame: &RawFrame<'_>) {
        let hex_len = match frame.data {
            FrameData::Bytes(bytes) => bytes.len() * 2,
            FrameData::Text(text) => text.len(),
        };
        let rate = PlatformRate::classify(hex_len, self.platform_1khz_hex_threshold);
        let declared = match device {
            DeviceType::Platform1kHz => PlatformRate::Khz1,
            _ => PlatformRate::Hz80,
        };
        if rate != declared && self.platform_rate != Some(rate) {
            debug!(?declared, observed = ?rate, hex_len, "platform burst size differs from declared rate");
        }
        self.platform_rate = Some(rate);
    }

    /// Rate suggested by the size of the last platform chunk.
    pub fn platform_rate(&self) -> Option<PlatformRate> {
        self.platform_rate
    }

    /// Decode statistics accumulated since construction.
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// The encoder motion processor owned by this router.
    pub fn motion(&self) -> &MotionProcessor {
        &self.motion
    }

    /// Clear the motion pipeline, the timestamp clamp and the statistics.
    pub fn reset(&mut self) {
        self.motion.reset();
        self.platform_rate = None;
        self.last_timestamp_ms = 0;
        self.stats = DecodeStats::default();
    }
}
