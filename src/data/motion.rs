//! Encoder signal conditioning.
//!
//! [`MotionProcessor`] turns raw encoder pulse counts into smoothed linear distances
//! through a three-stage cascade of moving averages and finite differences:
//!
//! ```text
//! pulses ─► distance ─► mean(5) ─► Δ/Δt ─► velocity ─► mean(5) ─► Δ/Δt ─► acceleration ─► mean(5)
//! ```
//!
//! A distance is only published once the acceleration stage has produced a mean, and the
//! first `warmup` of those are discarded to hide the start-up transient of the cascade.
//! With the default window of 5 and warm-up of 20, the first distance appears on the
//! 33rd insertion.
//!
//! One processor belongs to exactly one acquisition session. A new session builds a new
//! processor (or calls [`MotionProcessor::reset`]); reusing one across sessions would mix
//! their histories.

use crate::config::MotionConfig;
use serde::Serialize;
use std::collections::VecDeque;
use std::f64::consts::PI;
use tracing::debug;

/// Radius of the encoder drum, in metres.
pub const DRUM_RADIUS_M: f64 = 0.0334;
/// Encoder pulses per drum revolution.
pub const PULSES_PER_REVOLUTION: f64 = 600.0;
/// Nominal encoder sampling period, in seconds.
pub const SAMPLE_PERIOD_S: f64 = 0.00482;
/// Length of each smoothing window.
pub const WINDOW: usize = 5;
/// Number of initial outputs discarded.
pub const WARMUP: u32 = 20;
/// Default load moved by the athlete, in kilograms.
pub const LOAD_KG: f64 = 10.0;
/// Standard gravity, in m/s².
pub const GRAVITY: f64 = 9.81;

/// A fixed-length sliding window that reports its mean once full.
///
/// When the window reaches capacity the mean is returned and the oldest entry is
/// discarded, so every subsequent push yields a new mean.
#[derive(Debug, Clone)]
struct SlidingMean {
    capacity: usize,
    buffer: VecDeque<f64>,
}

impl SlidingMean {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    fn push(&mut self, value: f64) -> Option<f64> {
        self.buffer.push_back(value);
        if self.buffer.len() < self.capacity {
            return None;
        }
        let sum: f64 = self.buffer.iter().sum();
        let mean = sum / self.buffer.len() as f64;
        self.buffer.pop_front();
        Some(mean)
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Latest smoothed state of the cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Kinematics {
    /// Smoothed distance, metres.
    pub distance_m: f64,
    /// Smoothed velocity, m/s.
    pub velocity_m_s: f64,
    /// Smoothed acceleration, m/s².
    pub acceleration_m_s2: f64,
    /// Estimated force on the load, newtons.
    pub force_n: f64,
}

/// Stateful distance/velocity/acceleration pipeline for one encoder session.
#[derive(Debug, Clone)]
pub struct MotionProcessor {
    metres_per_pulse: f64,
    sample_period_s: f64,
    load_kg: f64,
    warmup: u32,
    warmup_remaining: u32,
    distance_window: SlidingMean,
    velocity_window: SlidingMean,
    acceleration_window: SlidingMean,
    last_distance: f64,
    last_velocity: f64,
    latest: Kinematics,
    distances: Vec<f64>,
    drained: usize,
}

impl Default for MotionProcessor {
    fn default() -> Self {
        Self::new(&MotionConfig::default())
    }
}

impl MotionProcessor {
    /// Build a processor from its configuration section.
    pub fn new(config: &MotionConfig) -> Self {
        let window = config.window.max(1);
        Self {
            metres_per_pulse: 2.0 * PI * config.drum_radius_m / PULSES_PER_REVOLUTION,
            sample_period_s: config.sample_period_s,
            load_kg: config.load_kg,
            warmup: config.warmup,
            warmup_remaining: config.warmup,
            distance_window: SlidingMean::new(window),
            velocity_window: SlidingMean::new(window),
            acceleration_window: SlidingMean::new(window),
            last_distance: 0.0,
            last_velocity: 0.0,
            latest: Kinematics::default(),
            distances: Vec::new(),
            drained: 0,
        }
    }

    /// Feed one raw pulse count through the cascade.
    pub fn insert(&mut self, pulses: f64) {
        let raw_distance = pulses * self.metres_per_pulse;
        let Some(distance) = self.distance_window.push(raw_distance) else {
            return;
        };
        self.latest.distance_m = distance;

        let velocity = (distance - self.last_distance) / self.sample_period_s;
        if let Some(mean_velocity) = self.velocity_window.push(velocity) {
            self.latest.velocity_m_s = mean_velocity;

            let acceleration = (mean_velocity - self.last_velocity) / self.sample_period_s;
            if let Some(mean_acceleration) = self.acceleration_window.push(acceleration) {
                self.latest.acceleration_m_s2 = mean_acceleration;
                if self.warmup_remaining > 0 {
                    self.warmup_remaining -= 1;
                } else {
                    self.distances.push(round_to_millis(distance));
                }
                self.latest.force_n = self.load_kg * (mean_acceleration + GRAVITY);
            }
            self.last_velocity = mean_velocity;
        }
        self.last_distance = distance;
    }

    /// Every distance published so far in this session.
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Distances published since the previous call.
    pub fn drain_pending(&mut self) -> Vec<f64> {
        let pending = self.distances[self.drained..].to_vec();
        self.drained = self.distances.len();
        pending
    }

    /// Latest smoothed kinematics, including values produced during warm-up.
    pub fn kinematics(&self) -> Kinematics {
        self.latest
    }

    /// True while initial outputs are still being discarded.
    pub fn is_warming_up(&self) -> bool {
        self.warmup_remaining > 0
    }

    /// Return to the freshly constructed state.
    pub fn reset(&mut self) {
        debug!(published = self.distances.len(), "resetting motion processor");
        self.distance_window.clear();
        self.velocity_window.clear();
        self.acceleration_window.clear();
        self.warmup_remaining = self.warmup;
        self.last_distance = 0.0;
        self.last_velocity = 0.0;
        self.latest = Kinematics::default();
        self.distances.clear();
        self.drained = 0;
    }
}

fn round_to_millis(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const FIRST_OUTPUT_AT: usize = 3 * (WINDOW - 1) + 1 + WARMUP as usize;

    fn metres_per_pulse() -> f64 {
        2.0 * PI * DRUM_RADIUS_M / PULSES_PER_REVOLUTION
    }

    #[test]
    fn test_sliding_mean_reports_once_full() {
        let mut window = SlidingMean::new(3);
        assert_eq!(window.push(1.0), None);
        assert_eq!(window.push(2.0), None);
        assert_eq!(window.push(3.0), Some(2.0));
        assert_eq!(window.push(6.0), Some(11.0 / 3.0));
    }

    #[test]
    fn test_first_output_after_cascade_and_warmup() {
        let mut processor = MotionProcessor::default();
        for _ in 0..FIRST_OUTPUT_AT - 1 {
            processor.insert(100.0);
        }
        assert!(processor.distances().is_empty());
        assert!(!processor.is_warming_up());

        processor.insert(100.0);
        assert_eq!(processor.distances().len(), 1);
        assert_abs_diff_eq!(
            processor.distances()[0],
            round_to_millis(100.0 * metres_per_pulse()),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_constant_stream_settles_to_rest() {
        let mut processor = MotionProcessor::default();
        for _ in 0..60 {
            processor.insert(250.0);
        }
        let k = processor.kinematics();
        assert_abs_diff_eq!(k.velocity_m_s, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(k.acceleration_m_s2, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(k.force_n, LOAD_KG * GRAVITY, epsilon = 1e-4);
    }

    #[test]
    fn test_linear_ramp_gives_constant_velocity() {
        let slope = 3.0;
        let mut processor = MotionProcessor::default();
        for n in 0..80 {
            processor.insert(slope * n as f64);
        }
        let expected = slope * metres_per_pulse() / SAMPLE_PERIOD_S;
        let k = processor.kinematics();
        assert_abs_diff_eq!(k.velocity_m_s, expected, epsilon = 1e-9);
        assert_abs_diff_eq!(k.acceleration_m_s2, 0.0, epsilon = 1e-6);

        let distances = processor.distances();
        assert!(distances.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_drain_pending_is_incremental() {
        let mut processor = MotionProcessor::default();
        for n in 0..FIRST_OUTPUT_AT + 2 {
            processor.insert(n as f64);
        }
        assert_eq!(processor.drain_pending().len(), 3);
        assert!(processor.drain_pending().is_empty());

        processor.insert(100.0);
        assert_eq!(processor.drain_pending().len(), 1);
        assert_eq!(processor.distances().len(), 4);
    }

    #[test]
    fn test_reset_restores_warmup() {
        let mut processor = MotionProcessor::default();
        for n in 0..50 {
            processor.insert(n as f64);
        }
        assert!(!processor.distances().is_empty());

        processor.reset();
        assert!(processor.distances().is_empty());
        assert!(processor.is_warming_up());
        assert_eq!(processor.kinematics(), Kinematics::default());

        for _ in 0..FIRST_OUTPUT_AT - 1 {
            processor.insert(1.0);
        }
        assert!(processor.distances().is_empty());
    }

    #[test]
    fn test_custom_window_and_warmup() {
        let config = MotionConfig {
            window: 2,
            warmup: 0,
            ..MotionConfig::default()
        };
        let mut processor = MotionProcessor::new(&config);
        processor.insert(0.0);
        processor.insert(0.0);
        processor.insert(0.0);
        assert!(processor.distances().is_empty());
        processor.insert(0.0);
        assert_eq!(processor.distances(), &[0.0]);
    }
}
