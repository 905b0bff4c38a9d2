//! Cross-crate integration test helpers.
//!
//! Provides a harness that writes through [`SessionWriter`] while keeping
//! an independent model of what each channel should hold, and checks the
//! stored session against it.

use crate::fixtures::TestSession;
use mefkit_core::intervals::{find_intervals, validity_mask};
use mefkit_core::quantize::quantize;
use mefkit_core::{SessionWriter, WriteOutcome, WriteRequest, WriterConfig};
use mefkit_storage::TimeRange;
use std::collections::HashMap;

/// Expected contents of one channel.
#[derive(Debug, Clone)]
struct ChannelModel {
    sampling_frequency: f64,
    precision: u32,
    end_time: i64,
    stored: Vec<i32>,
}

/// A test harness for integration testing.
pub struct IntegrationHarness {
    /// The session under test.
    pub session: TestSession,
    channels: HashMap<String, ChannelModel>,
}

impl IntegrationHarness {
    /// Creates a new integration harness over an in-memory session.
    pub fn new() -> Self {
        Self::with_config(WriterConfig::default())
    }

    /// Creates a harness with a custom writer configuration.
    pub fn with_config(config: WriterConfig) -> Self {
        Self {
            session: TestSession::memory_with(config),
            channels: HashMap::new(),
        }
    }

    /// The writer under test.
    pub fn writer(&mut self) -> &mut SessionWriter {
        &mut self.session.writer
    }

    /// Expected end of a channel's stored data, if it holds any.
    pub fn channel_end(&self, channel: &str) -> Option<i64> {
        self.channels.get(channel).map(|m| m.end_time)
    }

    /// Writes samples and checks the outcome against the model.
    ///
    /// Panics if the writer accepts a write the model rejects or the other
    /// way round.
    pub fn write(
        &mut self,
        channel: &str,
        samples: &[f64],
        start_uutc: i64,
        sampling_frequency: f64,
        new_segment: bool,
    ) -> WriteOutcome {
        let expect_rejection = self.channels.get(channel).is_some_and(|m| {
            start_uutc < m.end_time || sampling_frequency != m.sampling_frequency
        });

        let request = WriteRequest::new(channel, samples, start_uutc, sampling_frequency)
            .new_segment(new_segment);
        let outcome = self.session.writer.write(&request).expect("Failed to write");
        assert_eq!(
            outcome.is_written(),
            !expect_rejection,
            "unexpected outcome {outcome:?} for write at {start_uutc}"
        );

        if let WriteOutcome::Written(summary) = &outcome {
            self.record(channel, samples, start_uutc, sampling_frequency, summary.precision);
        }
        outcome
    }

    fn record(
        &mut self,
        channel: &str,
        samples: &[f64],
        start_uutc: i64,
        sampling_frequency: f64,
        precision: u32,
    ) {
        let tolerance = self
            .session
            .writer
            .config()
            .gap_tolerance
            .resolve(sampling_frequency);
        let intervals = find_intervals(
            &validity_mask(samples),
            sampling_frequency,
            start_uutc,
            tolerance,
        );
        let Some(last) = intervals.last() else {
            return;
        };
        let quantized = quantize(samples, i64::from(precision));

        let model = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| ChannelModel {
                sampling_frequency,
                precision,
                end_time: i64::MIN,
                stored: Vec::new(),
            });
        assert_eq!(model.precision, precision, "channel precision changed");
        for interval in &intervals {
            model
                .stored
                .extend_from_slice(&quantized.samples[interval.sample_range()]);
        }
        model.end_time = model.end_time.max(last.stop_uutc);
    }

    /// Verifies every modelled channel against the stored session.
    pub fn verify_all(&mut self) {
        let reader = self.session.reader();
        let everything = TimeRange::new(i64::MIN, i64::MAX);
        for (name, model) in &self.channels {
            let info = reader
                .channel_info(name)
                .unwrap_or_else(|| panic!("channel {name} missing"));
            assert_eq!(info.end_time, model.end_time, "end time of {name}");
            assert_eq!(
                info.number_of_samples,
                model.stored.len() as u64,
                "sample count of {name}"
            );
            let slots = reader
                .read_raw(name.as_str(), Some(everything))
                .expect("Failed to read");
            let stored: Vec<i32> = slots[0].iter().flatten().copied().collect();
            assert_eq!(stored, model.stored, "samples of {name}");
        }
        assert_eq!(reader.channels().len(), self.channels.len());
    }

    /// Returns the count of tracked channels.
    pub fn tracked_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for IntegrationHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::with_file_session;
    use crate::generators::{
        annotation_strategy, sampling_frequency_strategy, write_sequence_strategy,
        PropTestConfig,
    };
    use mefkit_core::{GapTolerance, SessionReader, WriteRejection};
    use mefkit_storage::{Credentials, FileEngine, OpenMode};
    use proptest::prelude::*;

    #[test]
    fn test_integration_harness() {
        let mut harness = IntegrationHarness::new();
        harness.write("a", &[1.0, 2.0, f64::NAN, 4.0], 0, 1.0, false);
        harness.write("a", &[5.0, 6.0], 4_000_000, 1.0, true);
        harness.write("b", &[0.5; 10], 1_000, 10.0, false);
        assert_eq!(harness.tracked_count(), 2);
        assert_eq!(harness.channel_end("a"), Some(6_000_000));
        harness.verify_all();
    }

    #[test]
    fn test_overlap_and_frequency_rejections() {
        let mut harness = IntegrationHarness::new();
        harness.write("a", &[1.0, 2.0], 0, 1.0, false);

        let overlap = harness.write("a", &[3.0], 1_000_000, 1.0, false);
        assert!(matches!(
            overlap.rejection(),
            Some(WriteRejection::OverlapsExistingData { .. })
        ));
        let mismatch = harness.write("a", &[3.0], 2_000_000, 2.0, false);
        assert!(matches!(
            mismatch.rejection(),
            Some(WriteRejection::SamplingFrequencyMismatch { .. })
        ));
        harness.verify_all();
    }

    #[test]
    fn test_long_gap_splits_short_gap_merges() {
        let mut harness = IntegrationHarness::with_config(
            WriterConfig::new().gap_tolerance(GapTolerance::Samples(2)),
        );
        let mut samples = vec![1.0; 20];
        samples[3] = f64::NAN;
        samples[4] = f64::NAN;
        for s in &mut samples[10..15] {
            *s = f64::NAN;
        }
        let outcome = harness.write("a", &samples, 0, 10.0, false);
        assert_eq!(outcome.summary().map(|s| s.intervals), Some(2));
        harness.verify_all();
    }

    #[test]
    fn test_file_session_survives_reopen() {
        with_file_session(|writer, path| {
            let samples: Vec<f64> = (0..50).map(|i| f64::from(i) * 0.01).collect();
            writer
                .write(&WriteRequest::new("eeg", &samples, 10_000, 50.0))
                .unwrap();
            writer
                .write_annotations(&[mefkit_storage::Annotation::note(10_000, "start")], None)
                .unwrap();
            writer.close().unwrap();

            let engine = FileEngine::open(path, OpenMode::Open, &Credentials::none()).unwrap();
            let reader = SessionReader::open(engine).unwrap();
            let data = reader.read("eeg", None).unwrap();
            assert_eq!(data[0].len(), 50);
            for (read, written) in data[0].iter().zip(&samples) {
                assert!((read - written).abs() < 1e-9);
            }
            assert_eq!(reader.read_annotations(None).unwrap().len(), 1);
        });
    }

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn writes_stay_append_only(
            steps in write_sequence_strategy(1, 8),
            fs in sampling_frequency_strategy(),
        ) {
            let mut harness = IntegrationHarness::new();
            for step in &steps {
                let start = harness.channel_end("ch").unwrap_or(0) + step.offset;
                harness.write("ch", &step.samples, start, fs, step.new_segment);
            }
            harness.verify_all();
        }

        #[test]
        fn annotations_keep_newest_first(
            batches in prop::collection::vec(prop::collection::vec(annotation_strategy(), 1..4), 1..5),
        ) {
            let mut harness = IntegrationHarness::new();
            for batch in &batches {
                harness.writer().write_annotations(batch, None).unwrap();
            }

            let stored = harness.writer().read_annotations(None).unwrap();
            let expected: Vec<_> = batches.iter().rev().flatten().cloned().collect();
            prop_assert_eq!(stored, expected);
        }
    }
}
