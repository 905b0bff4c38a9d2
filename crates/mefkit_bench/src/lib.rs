//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate `len` reproducible samples in `±magnitude` with two decimals.
pub fn random_signal(len: usize, magnitude: f64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(0x6d65_666b);
    (0..len)
        .map(|_| (rng.gen_range(-magnitude..magnitude) * 100.0).round() / 100.0)
        .collect()
}

/// Generate a signal with a run of `gap_len` NaN samples every `period` samples.
pub fn gapped_signal(len: usize, period: usize, gap_len: usize) -> Vec<f64> {
    let mut signal = random_signal(len, 500.0);
    for start in (period..len).step_by(period.max(1)) {
        let stop = (start + gap_len).min(len);
        for sample in &mut signal[start..stop] {
            *sample = f64::NAN;
        }
    }
    signal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_signal_is_reproducible() {
        assert_eq!(random_signal(16, 10.0), random_signal(16, 10.0));
    }

    #[test]
    fn gapped_signal_places_gaps() {
        let signal = gapped_signal(100, 40, 5);
        let gaps = signal.iter().filter(|x| x.is_nan()).count();
        assert_eq!(gaps, 10);
        assert!(signal[40].is_nan());
        assert!(!signal[39].is_nan());
    }
}
