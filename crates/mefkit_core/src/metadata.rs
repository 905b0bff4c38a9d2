//! Cached per-channel metadata.
//!
//! The cache mirrors what the storage engine reports and is rebuilt as a
//! whole from the engine; write logic never patches individual fields.

use crate::error::CoreResult;
use crate::quantize::precision_from_scale_factor;
use mefkit_storage::StorageEngine;
use std::collections::HashMap;
use tracing::debug;

/// Sampling frequency from which one second of samples makes one block.
pub const HIGH_RATE_THRESHOLD: f64 = 5000.0;

/// Block length used for a channel sampled at `sampling_frequency`.
///
/// An explicit override wins. Otherwise channels at or above
/// [`HIGH_RATE_THRESHOLD`] use one second of samples per block and slower
/// channels ten seconds. A negative frequency yields `100 × fs`; no valid
/// channel has one, and the storage engine rejects the resulting length.
#[must_use]
pub fn block_length_for(sampling_frequency: f64, override_length: Option<i64>) -> i64 {
    if let Some(length) = override_length {
        return length;
    }
    if sampling_frequency >= HIGH_RATE_THRESHOLD {
        sampling_frequency as i64
    } else if sampling_frequency < 0.0 {
        (sampling_frequency * 100.0) as i64
    } else {
        (sampling_frequency * 10.0) as i64
    }
}

/// Immutable snapshot of one channel's state.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    /// Channel name.
    pub name: String,
    /// Sampling frequency in Hz, fixed for the channel's lifetime.
    pub sampling_frequency: f64,
    /// Fixed-point divisor (`10^-precision`), fixed by the first write.
    pub scale_factor: f64,
    /// Unit label.
    pub units: String,
    /// Storage block length in samples.
    pub block_length: i64,
    /// Number of segments.
    pub segment_count: usize,
    /// Total stored samples.
    pub number_of_samples: u64,
    /// Start of the first segment (uutc).
    pub start_time: i64,
    /// End of the stored data (uutc).
    pub end_time: i64,
}

impl ChannelInfo {
    /// Precision encoded by the channel's scale factor.
    #[must_use]
    pub fn precision(&self) -> u32 {
        precision_from_scale_factor(self.scale_factor)
    }
}

/// In-memory view of all channels of a session.
#[derive(Debug, Default)]
pub struct ChannelMetadataCache {
    channels: HashMap<String, ChannelInfo>,
}

impl ChannelMetadataCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the cache from the engine's basic info and segment counts.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if it cannot be reloaded or read. The
    /// previous contents are kept in that case.
    pub fn refresh(
        &mut self,
        engine: &mut dyn StorageEngine,
        block_length_override: Option<i64>,
    ) -> CoreResult<()> {
        engine.reload()?;
        let basic_info = engine.read_basic_info()?;

        let mut channels = HashMap::with_capacity(basic_info.len());
        for info in basic_info {
            let segment_count = engine.segment_count(&info.name)?;
            let sampling_frequency = info.sampling_frequency();
            channels.insert(
                info.name.clone(),
                ChannelInfo {
                    sampling_frequency,
                    scale_factor: info.units_conversion_factor,
                    units: info.units_description,
                    block_length: block_length_for(sampling_frequency, block_length_override),
                    segment_count,
                    number_of_samples: info.number_of_samples,
                    start_time: info.start_time,
                    end_time: info.end_time,
                    name: info.name,
                },
            );
        }

        self.channels = channels;
        debug!(channels = self.channels.len(), "channel metadata refreshed");
        Ok(())
    }

    /// Looks up a channel.
    #[must_use]
    pub fn get(&self, channel: &str) -> Option<&ChannelInfo> {
        self.channels.get(channel)
    }

    /// Returns true if the channel is known.
    #[must_use]
    pub fn contains(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    /// Sorted channel names.
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of known channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns true if no channel is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mefkit_storage::{Credentials, InMemoryEngine, RecordingMetadata, SegmentMetadata};

    fn engine_with_channel(name: &str, fs: f64) -> InMemoryEngine {
        let mut engine = InMemoryEngine::new();
        let creds = Credentials::none();
        let meta = SegmentMetadata {
            sampling_frequency: fs,
            units_conversion_factor: 0.01,
            units_description: "uV".into(),
            ..SegmentMetadata::default()
        };
        engine
            .create_segment(name, 0, &creds, 1_000, 2_000_000, &meta, &RecordingMetadata::default())
            .unwrap();
        engine
            .write_segment_samples(name, 0, &creds, 100, &[5; 20])
            .unwrap();
        engine
    }

    #[test]
    fn block_length_rules() {
        assert_eq!(block_length_for(256.0, Some(42)), 42);
        assert_eq!(block_length_for(5000.0, None), 5000);
        assert_eq!(block_length_for(20_000.7, None), 20_000);
        assert_eq!(block_length_for(256.0, None), 2560);
        assert_eq!(block_length_for(0.5, None), 5);
    }

    #[test]
    fn block_length_negative_frequency_uses_hundredfold() {
        assert_eq!(block_length_for(-10.0, None), -1000);
        assert_eq!(block_length_for(-0.5, None), -50);
    }

    #[test]
    fn refresh_mirrors_engine() {
        let mut engine = engine_with_channel("eeg", 10.0);
        let mut cache = ChannelMetadataCache::new();
        cache.refresh(&mut engine, None).unwrap();

        let info = cache.get("eeg").unwrap();
        assert_eq!(info.sampling_frequency, 10.0);
        assert_eq!(info.scale_factor, 0.01);
        assert_eq!(info.precision(), 2);
        assert_eq!(info.block_length, 100);
        assert_eq!(info.segment_count, 1);
        assert_eq!(info.number_of_samples, 20);
        assert_eq!(info.start_time, 1_000);
        assert_eq!(info.end_time, 2_001_000);
        assert_eq!(info.units, "uV");
    }

    #[test]
    fn refresh_replaces_whole_cache() {
        let mut engine = engine_with_channel("eeg", 10.0);
        let mut cache = ChannelMetadataCache::new();
        cache.refresh(&mut engine, Some(7)).unwrap();
        assert_eq!(cache.get("eeg").unwrap().block_length, 7);

        engine.clear();
        cache.refresh(&mut engine, None).unwrap();
        assert!(cache.is_empty());
        assert!(!cache.contains("eeg"));
    }

    #[test]
    fn channels_are_sorted() {
        let mut engine = engine_with_channel("b", 10.0);
        let meta = SegmentMetadata {
            sampling_frequency: 1.0,
            ..SegmentMetadata::default()
        };
        engine
            .create_segment("a", 0, &Credentials::none(), 0, 1, &meta, &RecordingMetadata::default())
            .unwrap();
        let mut cache = ChannelMetadataCache::new();
        cache.refresh(&mut engine, None).unwrap();
        assert_eq!(cache.channels(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(cache.len(), 2);
    }
}
