//! Property-style checks of the decoding core, exercised through the public API.

use approx::assert_abs_diff_eq;
use force_daq::config::{DaqConfig, MotionConfig};
use force_daq::core::{Decoded, DeviceType, FrameDecoder, RawFrame};
use force_daq::data::motion::{MotionProcessor, DRUM_RADIUS_M, PULSES_PER_REVOLUTION, SAMPLE_PERIOD_S};
use force_daq::data::trim::{flat_run_len, trim_flat_tail, FlatTailKey, DEFAULT_MAX_FLAT};
use force_daq::decoders::platform::{JITTER_MARKER, MARKER};
use force_daq::decoders::PlatformDecoder;
use force_daq::{DecodeStats, DeviceRouter, ForcePair, Sample};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn packet(marker: &str, ch1: u16, ch2: u16) -> String {
    let [l1, h1] = ch1.to_le_bytes();
    let [l2, h2] = ch2.to_le_bytes();
    format!("{marker}{}", hex::encode([l1, h1, l2, h2]))
}

/// Garbage bytes that can never start or complete a marker.
fn garbage(rng: &mut ChaCha8Rng, len: usize) -> String {
    let bytes: Vec<u8> = (0..len)
        .map(|_| loop {
            let b: u8 = rng.gen();
            if b != 0x4c && b != 0x3a {
                break b;
            }
        })
        .collect();
    hex::encode(bytes)
}

#[test]
fn platform_recovers_every_packet_through_garbage() {
    let decoder = PlatformDecoder::default();
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    for _ in 0..50 {
        let n = rng.gen_range(1..=20);
        let mut expected = Vec::with_capacity(n);
        let lead = rng.gen_range(0..5);
        let mut stream = garbage(&mut rng, lead);

        for _ in 0..n {
            let ch1: u16 = rng.gen_range(0..=2000);
            let ch2: u16 = rng.gen_range(0..=2000);
            let marker = if rng.gen_bool(0.5) { MARKER } else { JITTER_MARKER };
            stream.push_str(&packet(marker, ch1, ch2));
            let gap = rng.gen_range(0..4);
            stream.push_str(&garbage(&mut rng, gap));
            expected.push((f64::from(ch1) / 10.0, f64::from(ch2) / 10.0));
        }

        let mut stats = DecodeStats::default();
        let pairs = decoder.decode(&RawFrame::text(&stream, 3), &mut stats);
        let got: Vec<(f64, f64)> = pairs.iter().map(|p| (p.channel1, p.channel2)).collect();
        assert_eq!(got, expected, "stream {stream}");
    }
}

#[test]
fn platform_outliers_do_not_abort_the_frame() {
    let decoder = PlatformDecoder::default();
    let stream = [
        packet(MARKER, 150, 150),
        packet(MARKER, 2500, 10),
        packet(JITTER_MARKER, 10, 65535),
        packet(MARKER, 1999, 2000),
    ]
    .concat();

    let mut stats = DecodeStats::default();
    let pairs = decoder.decode(&RawFrame::text(&stream, 0), &mut stats);

    assert_eq!(pairs, vec![ForcePair::new(15.0, 15.0, 0), ForcePair::new(199.9, 200.0, 0)]);
    assert!(pairs.iter().all(|p| p.channel1.abs() <= 200.0 && p.channel2.abs() <= 200.0));
    assert_eq!(stats.out_of_range, 2);
}

#[test]
fn trimmer_properties_hold_for_generated_sequences() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for _ in 0..200 {
        let prefix: usize = rng.gen_range(0..15);
        let run: usize = rng.gen_range(0..40);
        let mut values: Vec<f64> = (0..prefix).map(|i| i as f64 * 0.5).collect();
        values.extend(std::iter::repeat(-1.0).take(run));
        let samples: Vec<Sample> = values.iter().map(|&v| Sample::new(v, 0)).collect();

        let measured = flat_run_len(&samples, Sample::flat_key);
        let once = trim_flat_tail(samples.clone(), DEFAULT_MAX_FLAT);
        let twice = trim_flat_tail(once.clone(), DEFAULT_MAX_FLAT);

        assert_eq!(once, twice);
        if measured <= DEFAULT_MAX_FLAT {
            assert_eq!(once, samples);
        } else {
            assert_eq!(once.len(), samples.len() - measured + DEFAULT_MAX_FLAT);
        }
    }
}

#[test]
fn motion_constant_stream_comes_to_rest() {
    let mut processor = MotionProcessor::default();
    for _ in 0..100 {
        processor.insert(420.0);
    }
    let k = processor.kinematics();
    assert_abs_diff_eq!(k.velocity_m_s, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(k.acceleration_m_s2, 0.0, epsilon = 1e-6);
    assert!(processor.distances().windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn motion_ramp_velocity_matches_slope() {
    let metres_per_pulse = 2.0 * std::f64::consts::PI * DRUM_RADIUS_M / PULSES_PER_REVOLUTION;
    for slope in [1.0, 4.0, -2.5] {
        let mut processor = MotionProcessor::new(&MotionConfig::default());
        for n in 0..120 {
            processor.insert(slope * n as f64);
        }
        let k = processor.kinematics();
        assert_abs_diff_eq!(k.velocity_m_s, slope * metres_per_pulse / SAMPLE_PERIOD_S, epsilon = 1e-9);
        assert_abs_diff_eq!(k.acceleration_m_s2, 0.0, epsilon = 1e-6);
    }
}

#[test]
fn scenario_dynamometer_hex_stream() {
    let mut router = DeviceRouter::new(&DaqConfig::default()).unwrap();
    let decoded = router.route(DeviceType::Dynamometer, &RawFrame::text("312e320d0a322e370d0a", 1000));
    assert_eq!(
        decoded,
        Decoded::Scalars(vec![Sample::new(1.2, 1000), Sample::new(2.7, 1000)])
    );
}

#[test]
fn scenario_encoder_tokens() {
    let decoder = force_daq::decoders::EncoderDecoder::default();
    let mut stats = DecodeStats::default();
    let samples = decoder.decode(&RawFrame::text("3054R-56.7R0.22RerrorDatoR", 0), &mut stats);
    let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
    assert_eq!(values, vec![3054.0, -56.7, 0.22]);
}

#[test]
fn scenario_platform_single_packet() {
    let mut router = DeviceRouter::new(&DaqConfig::default()).unwrap();
    let decoded = router.route(DeviceType::Platform80Hz, &RawFrame::text("4c3a01000200", 0));
    assert_eq!(decoded, Decoded::Forces(vec![ForcePair::new(0.1, 0.2, 0)]));
}

#[test]
fn decoding_never_panics_on_arbitrary_input() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mut router = DeviceRouter::default();
    for _ in 0..500 {
        let len: usize = rng.gen_range(0..64);
        let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        for device in DeviceType::ALL {
            router.route(device, &RawFrame::bytes(&bytes, 0));
            let text = String::from_utf8_lossy(&bytes);
            router.route(device, &RawFrame::text(&text, 0));
        }
    }
    let stats = router.stats();
    assert_eq!(stats.unknown_device, 0);
}
