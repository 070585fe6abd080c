//! Trailing flat-run trimming for finished sessions.
//!
//! When the athlete stops, the device keeps streaming the same settled reading until the
//! operator ends the test. [`trim_flat_tail`] shortens that idle plateau to at most
//! `max_flat` samples so a short settled tail remains visible in the export.
//!
//! Comparison is bit-exact on the floating-point fields. Decoders emit values at the
//! device's reported precision, so a resting device repeats the same bits.

use crate::measurement_types::{ForcePair, Sample};

/// Default number of trailing identical samples kept.
pub const DEFAULT_MAX_FLAT: usize = 10;

/// Equality key used to detect a flat tail.
pub trait FlatTailKey {
    /// Key type; two samples are "flat" when their keys are equal.
    type Key: PartialEq;

    /// Key of this sample.
    fn flat_key(&self) -> Self::Key;
}

impl FlatTailKey for Sample {
    type Key = u64;

    fn flat_key(&self) -> u64 {
        self.value.to_bits()
    }
}

impl FlatTailKey for ForcePair {
    type Key = (u64, u64);

    fn flat_key(&self) -> (u64, u64) {
        (self.channel1.to_bits(), self.channel2.to_bits())
    }
}

impl FlatTailKey for f64 {
    type Key = u64;

    fn flat_key(&self) -> u64 {
        self.to_bits()
    }
}

/// Trim the trailing flat run of `samples` down to `max_flat` entries.
pub fn trim_flat_tail<T: FlatTailKey>(samples: Vec<T>, max_flat: usize) -> Vec<T> {
    trim_flat_tail_by(samples, T::flat_key, max_flat)
}

/// Like [`trim_flat_tail`], with an explicit key function.
pub fn trim_flat_tail_by<T, K, F>(mut samples: Vec<T>, key: F, max_flat: usize) -> Vec<T>
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let run = flat_run_len(&samples, key);
    if run > max_flat {
        let keep = samples.len() - run + max_flat;
        samples.truncate(keep);
    }
    samples
}

/// Number of trailing samples sharing the last sample's key.
///
/// A lone last sample counts as a run of one; an empty slice has a run of zero.
pub fn flat_run_len<T, K, F>(samples: &[T], key: F) -> usize
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let Some(last) = samples.last() else {
        return 0;
    };
    let last_key = key(last);
    samples
        .iter()
        .rev()
        .take_while(|sample| key(sample) == last_key)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(values: &[f64]) -> Vec<Sample> {
        values.iter().map(|&v| Sample::new(v, 0)).collect()
    }

    fn with_plateau(prefix: &[f64], plateau: f64, run: usize) -> Vec<Sample> {
        let mut values = prefix.to_vec();
        values.extend(std::iter::repeat(plateau).take(run));
        samples(&values)
    }

    #[test]
    fn test_long_plateau_is_truncated() {
        let input = with_plateau(&[1.0, 2.0, 3.0], 4.0, 25);
        let trimmed = trim_flat_tail(input.clone(), DEFAULT_MAX_FLAT);

        assert_eq!(trimmed.len(), input.len() - 25 + DEFAULT_MAX_FLAT);
        assert_eq!(flat_run_len(&trimmed, Sample::flat_key), DEFAULT_MAX_FLAT);
        assert_eq!(&trimmed[..3], &input[..3]);
    }

    #[test]
    fn test_short_plateau_is_unchanged() {
        let input = with_plateau(&[1.0, 2.0], 4.0, DEFAULT_MAX_FLAT);
        assert_eq!(trim_flat_tail(input.clone(), DEFAULT_MAX_FLAT), input);
    }

    #[test]
    fn test_idempotent() {
        for run in [0, 1, 10, 11, 40] {
            let input = with_plateau(&[0.5, 0.7], 9.0, run);
            let once = trim_flat_tail(input, DEFAULT_MAX_FLAT);
            let twice = trim_flat_tail(once.clone(), DEFAULT_MAX_FLAT);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_whole_sequence_flat() {
        let input = with_plateau(&[], 2.0, 30);
        assert_eq!(trim_flat_tail(input, 5).len(), 5);
    }

    #[test]
    fn test_empty_input() {
        assert!(trim_flat_tail(Vec::<Sample>::new(), DEFAULT_MAX_FLAT).is_empty());
    }

    #[test]
    fn test_comparison_is_bit_exact() {
        let mut values = vec![1.0; 20];
        values[19] = 1.0 + f64::EPSILON;
        let input = samples(&values);
        assert_eq!(trim_flat_tail(input.clone(), 3), input);

        // 0.0 and -0.0 compare equal as floats but not as bits.
        let signed = samples(&[0.0, -0.0, 0.0]);
        assert_eq!(flat_run_len(&signed, Sample::flat_key), 1);
    }

    #[test]
    fn test_force_pairs_key_on_both_channels() {
        let mut pairs: Vec<ForcePair> = (0..15).map(|_| ForcePair::new(1.0, 2.0, 0)).collect();
        pairs.push(ForcePair::new(1.0, 2.5, 0));
        assert_eq!(trim_flat_tail(pairs.clone(), 2).len(), 16);

        pairs.pop();
        assert_eq!(trim_flat_tail(pairs, 2).len(), 2);
    }

    #[test]
    fn test_custom_key() {
        let input = samples(&[1.0, 2.0, 2.04, 2.01, 2.03]);
        let trimmed = trim_flat_tail_by(input, |s| (s.value * 10.0).round() as i64, 1);
        assert_eq!(trimmed.len(), 2);
    }
}
