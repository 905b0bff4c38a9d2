//! Session state shared by all engines.

use crate::error::{StorageError, StorageResult};
use crate::types::{
    Annotation, ChannelBasicInfo, Credentials, RecordingMetadata, SegmentMetadata, TimeRange,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// SHA-256 digest of a session password.
pub(crate) fn password_digest(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

fn digest_matches(expected: Option<&[u8; 32]>, supplied: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(digest) => supplied.map(password_digest).as_ref() == Some(digest),
    }
}

/// Microseconds spanned by `samples` samples at `fs` Hz.
fn samples_to_micros(samples: usize, fs: f64) -> i64 {
    (samples as f64 / fs * 1e6).round() as i64
}

/// Index of the first slot of the grid anchored at `origin` whose time is
/// at or after `t`.
fn first_slot_at_or_after(origin: i64, t: i64, fs: f64) -> usize {
    if t <= origin {
        return 0;
    }
    let slot_time = |k: usize| origin.saturating_add(samples_to_micros(k, fs));
    let mut k = (t.saturating_sub(origin) as f64 * fs / 1e6).ceil() as usize;
    while k > 0 && slot_time(k - 1) >= t {
        k -= 1;
    }
    while slot_time(k) < t {
        k += 1;
    }
    k
}

fn checked_block_length(block_length: i64) -> StorageResult<usize> {
    usize::try_from(block_length)
        .ok()
        .filter(|&len| len > 0)
        .ok_or(StorageError::InvalidBlockLength(block_length))
}

fn check_range(start: i64, end: i64) -> StorageResult<()> {
    if end < start {
        return Err(StorageError::InvalidTimeRange { start, end });
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordSet {
    start_time: i64,
    end_time: i64,
    record_offset: i64,
    records: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Block {
    start_time: i64,
    end_time: i64,
    samples: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SegmentState {
    start_time: i64,
    end_time: i64,
    metadata: SegmentMetadata,
    recording: RecordingMetadata,
    blocks: Vec<Block>,
}

impl SegmentState {
    fn sample_count(&self) -> u64 {
        self.blocks.iter().map(|b| b.samples.len() as u64).sum()
    }

    /// Splits `samples` into blocks of `block_length` starting at `start`.
    fn push_samples(&mut self, start: i64, end: i64, block_length: usize, samples: &[i32]) {
        let fs = self.metadata.sampling_frequency;
        for (i, chunk) in samples.chunks(block_length).enumerate() {
            let offset = i * block_length;
            self.blocks.push(Block {
                start_time: start.saturating_add(samples_to_micros(offset, fs)),
                end_time: start.saturating_add(samples_to_micros(offset + chunk.len(), fs)),
                samples: chunk.to_vec(),
            });
        }
        let data_end = self.blocks.last().map_or(start, |b| b.end_time);
        self.end_time = self.end_time.max(end).max(data_end);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ChannelState {
    segments: Vec<SegmentState>,
    records: Option<RecordSet>,
}

/// Everything an engine knows about one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct SessionState {
    level_1_digest: Option<[u8; 32]>,
    level_2_digest: Option<[u8; 32]>,
    channels: BTreeMap<String, ChannelState>,
    records: Option<RecordSet>,
}

impl SessionState {
    /// Creates an empty session protected by the given passwords.
    pub(crate) fn with_credentials(credentials: &Credentials) -> Self {
        Self {
            level_1_digest: credentials.level_1().map(password_digest),
            level_2_digest: credentials.level_2().map(password_digest),
            ..Self::default()
        }
    }

    /// Checks the access (level 2) password.
    pub(crate) fn authorize_access(&self, credentials: &Credentials) -> StorageResult<()> {
        if digest_matches(self.level_2_digest.as_ref(), credentials.level_2()) {
            Ok(())
        } else {
            Err(StorageError::AccessDenied)
        }
    }

    fn authorize_write(&self, credentials: &Credentials) -> StorageResult<()> {
        self.authorize_access(credentials)?;
        if digest_matches(self.level_1_digest.as_ref(), credentials.level_1()) {
            Ok(())
        } else {
            Err(StorageError::AccessDenied)
        }
    }

    /// Drops all channels and records, keeping the passwords.
    pub(crate) fn clear_data(&mut self) {
        self.channels.clear();
        self.records = None;
    }

    pub(crate) fn channel_names(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    pub(crate) fn basic_info(&self) -> Vec<ChannelBasicInfo> {
        self.channels
            .iter()
            .filter_map(|(name, channel)| {
                let first = channel.segments.first()?;
                let mut frequencies: Vec<f64> = Vec::new();
                for segment in &channel.segments {
                    let fs = segment.metadata.sampling_frequency;
                    if !frequencies.contains(&fs) {
                        frequencies.push(fs);
                    }
                }
                Some(ChannelBasicInfo {
                    name: name.clone(),
                    sampling_frequencies: frequencies,
                    units_conversion_factor: first.metadata.units_conversion_factor,
                    units_description: first.metadata.units_description.clone(),
                    number_of_samples: channel.segments.iter().map(SegmentState::sample_count).sum(),
                    start_time: first.start_time,
                    end_time: channel
                        .segments
                        .iter()
                        .map(|s| s.end_time)
                        .max()
                        .unwrap_or(first.end_time),
                })
            })
            .collect()
    }

    pub(crate) fn segment_count(&self, channel: &str) -> StorageResult<usize> {
        self.channels
            .get(channel)
            .map(|c| c.segments.len())
            .ok_or_else(|| StorageError::ChannelNotFound(channel.to_string()))
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn create_segment(
        &mut self,
        channel: &str,
        segment: usize,
        credentials: &Credentials,
        start_uutc: i64,
        end_uutc: i64,
        segment_metadata: &SegmentMetadata,
        recording_metadata: &RecordingMetadata,
    ) -> StorageResult<()> {
        self.authorize_write(credentials)?;
        check_range(start_uutc, end_uutc)?;
        let fs = segment_metadata.sampling_frequency;
        if !(fs.is_finite() && fs > 0.0) {
            return Err(StorageError::InvalidSamplingFrequency(fs));
        }

        let expected = self.channels.get(channel).map_or(0, |c| c.segments.len());
        if segment != expected {
            return Err(StorageError::SegmentOutOfOrder {
                channel: channel.to_string(),
                expected,
                actual: segment,
            });
        }

        self.channels
            .entry(channel.to_string())
            .or_default()
            .segments
            .push(SegmentState {
                start_time: start_uutc,
                end_time: end_uutc,
                metadata: segment_metadata.clone(),
                recording: recording_metadata.clone(),
                blocks: Vec::new(),
            });
        Ok(())
    }

    fn last_segment_mut(&mut self, channel: &str, segment: usize) -> StorageResult<&mut SegmentState> {
        let state = self
            .channels
            .get_mut(channel)
            .ok_or_else(|| StorageError::ChannelNotFound(channel.to_string()))?;
        let count = state.segments.len();
        if segment >= count {
            return Err(StorageError::SegmentNotFound {
                channel: channel.to_string(),
                segment,
            });
        }
        if segment + 1 != count {
            return Err(StorageError::SegmentSealed {
                channel: channel.to_string(),
                segment,
                last: count - 1,
            });
        }
        Ok(&mut state.segments[segment])
    }

    pub(crate) fn write_segment_samples(
        &mut self,
        channel: &str,
        segment: usize,
        credentials: &Credentials,
        block_length: i64,
        samples: &[i32],
    ) -> StorageResult<()> {
        self.authorize_write(credentials)?;
        let block_length = checked_block_length(block_length)?;
        let state = self.last_segment_mut(channel, segment)?;
        if !state.blocks.is_empty() {
            return Err(StorageError::SegmentNotEmpty {
                channel: channel.to_string(),
                segment,
            });
        }
        let (start, end) = (state.start_time, state.end_time);
        state.push_samples(start, end, block_length, samples);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn append_segment_samples(
        &mut self,
        channel: &str,
        segment: usize,
        credentials: &Credentials,
        start_uutc: i64,
        end_uutc: i64,
        block_length: i64,
        samples: &[i32],
    ) -> StorageResult<()> {
        self.authorize_write(credentials)?;
        check_range(start_uutc, end_uutc)?;
        let block_length = checked_block_length(block_length)?;
        let state = self.last_segment_mut(channel, segment)?;
        state.push_samples(start_uutc, end_uutc, block_length, samples);
        Ok(())
    }

    /// Samples of each channel in `range`, one slot per sample period.
    ///
    /// Slots lie on the grid of the channel's first segment: slot `k` sits
    /// at `start + round(k / fs * 1e6)`. The window is clipped to the
    /// channel's time span and slots without a stored sample are `None`.
    pub(crate) fn read_samples(
        &self,
        channels: &[String],
        range: TimeRange,
    ) -> StorageResult<Vec<Vec<Option<i32>>>> {
        channels
            .iter()
            .map(|name| {
                let channel = self
                    .channels
                    .get(name)
                    .ok_or_else(|| StorageError::ChannelNotFound(name.clone()))?;
                let Some(first) = channel.segments.first() else {
                    return Ok(Vec::new());
                };
                let origin = first.start_time;
                let grid_fs = first.metadata.sampling_frequency;
                let channel_end = channel
                    .segments
                    .iter()
                    .map(|s| s.end_time)
                    .max()
                    .unwrap_or(first.end_time);

                let lo = first_slot_at_or_after(origin, range.start, grid_fs);
                let hi = first_slot_at_or_after(origin, range.end.min(channel_end), grid_fs);
                let mut slots = vec![None; hi.saturating_sub(lo)];
                for segment in &channel.segments {
                    let fs = segment.metadata.sampling_frequency;
                    for block in &segment.blocks {
                        if block.end_time <= range.start || block.start_time >= range.end {
                            continue;
                        }
                        for (k, &sample) in block.samples.iter().enumerate() {
                            let t = block.start_time.saturating_add(samples_to_micros(k, fs));
                            let slot = (t.saturating_sub(origin) as f64 * grid_fs / 1e6).round();
                            if slot < lo as f64 || slot >= hi as f64 {
                                continue;
                            }
                            slots[slot as usize - lo] = Some(sample);
                        }
                    }
                }
                Ok(slots)
            })
            .collect()
    }

    pub(crate) fn read_records(&self, channel: Option<&str>) -> StorageResult<Vec<Annotation>> {
        let set = match channel {
            None => self.records.as_ref(),
            Some(name) => self
                .channels
                .get(name)
                .ok_or_else(|| StorageError::ChannelNotFound(name.to_string()))?
                .records
                .as_ref(),
        };
        set.map(|s| s.records.clone()).ok_or_else(|| StorageError::NoRecords {
            scope: channel.unwrap_or("session").to_string(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn write_records(
        &mut self,
        credentials: &Credentials,
        start_uutc: i64,
        end_uutc: i64,
        record_offset: i64,
        records: &[Annotation],
        channel: Option<&str>,
    ) -> StorageResult<()> {
        self.authorize_write(credentials)?;
        check_range(start_uutc, end_uutc)?;
        let set = RecordSet {
            start_time: start_uutc,
            end_time: end_uutc,
            record_offset,
            records: records.to_vec(),
        };
        match channel {
            None => self.records = Some(set),
            Some(name) => {
                self.channels
                    .get_mut(name)
                    .ok_or_else(|| StorageError::ChannelNotFound(name.to_string()))?
                    .records = Some(set);
            }
        }
        Ok(())
    }
}
