//! Gap detection and interval merging.
//!
//! A buffer with missing samples is stored as a sequence of contiguous
//! intervals. Short gaps are folded into the surrounding interval (their
//! samples are stored zero-filled); longer gaps are left out of storage.

use std::ops::Range;

/// How many consecutive missing samples an interval may absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapTolerance {
    /// One second worth of samples: `int(sampling_frequency)`.
    #[default]
    SamplingFrequency,
    /// An explicit number of samples.
    Samples(usize),
}

impl GapTolerance {
    /// Resolves the tolerance in samples for a sampling frequency.
    #[must_use]
    pub fn resolve(self, sampling_frequency: f64) -> usize {
        match self {
            // saturating cast: NaN and negative frequencies give 0
            Self::SamplingFrequency => sampling_frequency as usize,
            Self::Samples(samples) => samples,
        }
    }
}

/// A contiguous run of samples `[start_sample, stop_sample)` to be stored
/// together, with its timestamps `[start_uutc, stop_uutc)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    /// First sample offset in the input buffer.
    pub start_sample: usize,
    /// One past the last sample offset.
    pub stop_sample: usize,
    /// Timestamp of the first sample.
    pub start_uutc: i64,
    /// Timestamp one sample period after the last sample.
    pub stop_uutc: i64,
}

impl Interval {
    /// An interval covering a whole buffer of `len` samples with explicit
    /// timestamps.
    #[must_use]
    pub const fn whole(len: usize, start_uutc: i64, stop_uutc: i64) -> Self {
        Self {
            start_sample: 0,
            stop_sample: len,
            start_uutc,
            stop_uutc,
        }
    }

    /// Number of samples in the interval.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.stop_sample - self.start_sample
    }

    /// Returns true if the interval holds no samples.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stop_sample == self.start_sample
    }

    /// Sample offsets as a range, for slicing.
    #[must_use]
    pub const fn sample_range(&self) -> Range<usize> {
        self.start_sample..self.stop_sample
    }
}

/// Timestamp of sample `offset` in a buffer starting at `start_uutc`.
///
/// Saturates at the `i64` bounds instead of overflowing.
#[must_use]
pub fn offset_to_uutc(start_uutc: i64, offset: usize, sampling_frequency: f64) -> i64 {
    start_uutc.saturating_add((offset as f64 / sampling_frequency * 1e6).round() as i64)
}

/// Validity vector of a sample buffer: true where a sample is present.
#[must_use]
pub fn validity_mask(buffer: &[f64]) -> Vec<bool> {
    buffer.iter().map(|x| x.is_finite()).collect()
}

/// Maximal runs of `true` as `(start, stop)` pairs.
///
/// Equivalent to padding `valid` with `false` at both ends and taking
/// rising edges as starts and falling edges as stops.
fn valid_runs(valid: &[bool]) -> Vec<(usize, usize)> {
    let mut runs: Vec<(usize, usize)> = Vec::new();
    let mut prev = false;
    for (i, &present) in valid.iter().chain(std::iter::once(&false)).enumerate() {
        match (prev, present) {
            (false, true) => runs.push((i, i)),
            (true, false) => {
                if let Some(run) = runs.last_mut() {
                    run.1 = i;
                }
            }
            _ => {}
        }
        prev = present;
    }
    runs
}

/// Finds the intervals of `valid` to store.
///
/// Neighbouring runs of present samples separated by at most `tolerance`
/// missing samples are merged into one interval. The result is sorted,
/// non-overlapping, and consecutive intervals are separated by more than
/// `tolerance` samples. An all-gap (or empty) vector gives no intervals.
#[must_use]
pub fn find_intervals(
    valid: &[bool],
    sampling_frequency: f64,
    start_uutc: i64,
    tolerance: usize,
) -> Vec<Interval> {
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, stop) in valid_runs(valid) {
        match merged.last_mut() {
            Some(last) if start - last.1 <= tolerance => last.1 = stop,
            _ => merged.push((start, stop)),
        }
    }

    merged
        .into_iter()
        .map(|(start, stop)| Interval {
            start_sample: start,
            stop_sample: stop,
            start_uutc: offset_to_uutc(start_uutc, start, sampling_frequency),
            stop_uutc: offset_to_uutc(start_uutc, stop, sampling_frequency),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ranges(intervals: &[Interval]) -> Vec<(usize, usize)> {
        intervals.iter().map(|i| (i.start_sample, i.stop_sample)).collect()
    }

    #[test]
    fn offset_to_uutc_saturates() {
        assert_eq!(offset_to_uutc(1_000, 2, 0.0), i64::MAX);
        assert_eq!(offset_to_uutc(i64::MAX - 1, 10, 1.0), i64::MAX);
        assert_eq!(offset_to_uutc(1_000, 3, 1e-300), i64::MAX);
        assert_eq!(offset_to_uutc(1_000, 3, 2.0), 1_501_000);
    }

    #[test]
    fn short_gap_splits_with_small_tolerance() {
        let valid = validity_mask(&[1.0, f64::NAN, f64::NAN, 2.0, 3.0]);
        let intervals = find_intervals(&valid, 1.0, 0, 1);
        assert_eq!(ranges(&intervals), vec![(0, 1), (3, 5)]);
        assert_eq!(intervals[1].start_uutc, 3_000_000);
        assert_eq!(intervals[1].stop_uutc, 5_000_000);
    }

    #[test]
    fn gap_equal_to_tolerance_is_merged() {
        let valid = validity_mask(&[1.0, f64::NAN, f64::NAN, 2.0, 3.0]);
        let intervals = find_intervals(&valid, 1.0, 0, 2);
        assert_eq!(ranges(&intervals), vec![(0, 5)]);
    }

    #[test]
    fn all_valid_gives_one_interval() {
        let intervals = find_intervals(&[true; 8], 4.0, 1_000, 0);
        assert_eq!(ranges(&intervals), vec![(0, 8)]);
        assert_eq!(intervals[0].start_uutc, 1_000);
        assert_eq!(intervals[0].stop_uutc, 2_001_000);
    }

    #[test]
    fn all_gap_and_empty_give_nothing() {
        assert!(find_intervals(&[false; 5], 1.0, 0, 10).is_empty());
        assert!(find_intervals(&[], 1.0, 0, 10).is_empty());
    }

    #[test]
    fn leading_and_trailing_gaps_are_dropped() {
        let valid = [false, false, true, true, false];
        let intervals = find_intervals(&valid, 2.0, 0, 0);
        assert_eq!(ranges(&intervals), vec![(2, 4)]);
        assert_eq!(intervals[0].start_uutc, 1_000_000);
        assert_eq!(intervals[0].stop_uutc, 2_000_000);
    }

    #[test]
    fn merging_chains_across_several_gaps() {
        let valid = [true, false, true, false, true, false, false, false, true];
        let intervals = find_intervals(&valid, 1.0, 0, 1);
        assert_eq!(ranges(&intervals), vec![(0, 5), (8, 9)]);
    }

    #[test]
    fn timestamps_are_rounded() {
        // 1 / 3 Hz = 333_333.33 us per sample
        let intervals = find_intervals(&[true, false, false, true], 3.0, 0, 0);
        assert_eq!(intervals[0].stop_uutc, 333_333);
        assert_eq!(intervals[1].start_uutc, 1_000_000);
        assert_eq!(intervals[1].stop_uutc, 1_333_333);
    }

    #[test]
    fn default_tolerance_is_one_second() {
        assert_eq!(GapTolerance::default().resolve(256.0), 256);
        assert_eq!(GapTolerance::SamplingFrequency.resolve(0.5), 0);
        assert_eq!(GapTolerance::Samples(7).resolve(256.0), 7);
    }

    #[test]
    fn whole_interval_covers_buffer() {
        let interval = Interval::whole(10, 5, 15);
        assert_eq!(interval.sample_range(), 0..10);
        assert_eq!(interval.len(), 10);
        assert!(!interval.is_empty());
    }

    proptest! {
        #[test]
        fn intervals_cover_valid_samples(
            valid in prop::collection::vec(any::<bool>(), 0..300),
            tolerance in 0usize..6,
        ) {
            let intervals = find_intervals(&valid, 10.0, 0, tolerance);

            for pair in intervals.windows(2) {
                prop_assert!(pair[1].start_sample - pair[0].stop_sample > tolerance);
            }
            for interval in &intervals {
                prop_assert!(valid[interval.start_sample]);
                prop_assert!(valid[interval.stop_sample - 1]);
                let mut gap = 0;
                for &present in &valid[interval.sample_range()] {
                    gap = if present { 0 } else { gap + 1 };
                    prop_assert!(gap <= tolerance);
                }
            }
            for (i, &present) in valid.iter().enumerate() {
                if present {
                    prop_assert!(intervals.iter().any(|iv| iv.sample_range().contains(&i)));
                }
            }
        }

        #[test]
        fn zero_tolerance_gives_maximal_runs(valid in prop::collection::vec(any::<bool>(), 0..300)) {
            let intervals = find_intervals(&valid, 10.0, 0, 0);
            prop_assert_eq!(ranges(&intervals), valid_runs(&valid));
        }
    }
}
