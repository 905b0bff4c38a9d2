//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use mefkit_storage::{Annotation, RecordKind};
use proptest::prelude::*;

/// Strategy for generating valid channel names.
pub fn channel_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for common sampling frequencies whose sample period is a whole
/// number of microseconds.
pub fn sampling_frequency_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(1.0),
        Just(10.0),
        Just(250.0),
        Just(500.0),
        Just(1000.0),
        Just(5000.0),
    ]
}

/// Strategy for validity vectors.
pub fn validity_strategy(max_len: usize) -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(prop::bool::weighted(0.8), 0..max_len)
}

/// Strategy for finite sample buffers bounded by `±magnitude`.
///
/// The first two samples are the extremes, so the buffer's range is
/// symmetric and the dynamic-range check sees both bounds.
pub fn bounded_signal_strategy(
    magnitude: f64,
    max_len: usize,
) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0f64..1.0, 0..max_len).prop_map(move |rest| {
        let mut buffer = vec![-magnitude, magnitude];
        buffer.extend(rest.into_iter().map(|x| x * magnitude));
        buffer
    })
}

/// Strategy for sample buffers where some samples are gaps (NaN).
pub fn signal_with_gaps_strategy(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(
        prop_oneof![
            4 => (-500.0f64..500.0).prop_map(|x| (x * 100.0).round() / 100.0),
            1 => Just(f64::NAN),
        ],
        1..max_len,
    )
}

/// Strategy for record kinds.
pub fn record_kind_strategy() -> impl Strategy<Value = RecordKind> {
    prop_oneof![
        Just(RecordKind::Note),
        Just(RecordKind::Edfa),
        Just(RecordKind::Seizure),
        Just(RecordKind::Cursor),
        Just(RecordKind::Epoch),
    ]
}

/// Strategy for annotation records.
pub fn annotation_strategy() -> impl Strategy<Value = Annotation> {
    (
        0i64..10_000_000_000,
        record_kind_strategy(),
        prop::string::string_regex("[a-z ]{0,24}").expect("Invalid regex"),
        prop::option::of(0i64..60_000_000),
    )
        .prop_map(|(time, kind, text, duration)| Annotation {
            time,
            kind,
            text,
            duration,
        })
}

/// One write of a generated channel history.
#[derive(Debug, Clone)]
pub struct WriteStep {
    /// Samples of the write.
    pub samples: Vec<f64>,
    /// Microseconds between the previous write's end and this write's
    /// start. Negative values overlap the previous write.
    pub offset: i64,
    /// Whether to start a new segment.
    pub new_segment: bool,
}

/// Strategy for a sequence of writes to one channel.
pub fn write_sequence_strategy(
    min_steps: usize,
    max_steps: usize,
) -> impl Strategy<Value = Vec<WriteStep>> {
    prop::collection::vec(
        (
            signal_with_gaps_strategy(64),
            prop_oneof![3 => 0i64..5_000_000, 1 => -5_000_000i64..0],
            any::<bool>(),
        )
            .prop_map(|(samples, offset, new_segment)| WriteStep {
                samples,
                offset,
                new_segment,
            }),
        min_steps..max_steps,
    )
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
