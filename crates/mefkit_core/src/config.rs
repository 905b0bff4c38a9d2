//! Session writer configuration.

use crate::error::{CoreError, CoreResult};
use crate::intervals::GapTolerance;
use mefkit_storage::{RecordingMetadata, SegmentMetadata};

/// Longest unit label, in bytes, that segment metadata can hold.
pub const MAX_UNITS_LEN: usize = 20;

/// Defaults for the descriptive fields of every created segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDefaults {
    /// Channel description.
    pub channel_description: String,
    /// Session description.
    pub session_description: String,
    /// Reference electrode description.
    pub reference_description: String,
    /// Acquisition channel number.
    pub acquisition_channel_number: i32,
    /// Notch filter setting in Hz.
    pub notch_filter_frequency: f64,
    /// Low frequency filter setting in Hz.
    pub low_frequency_filter: f64,
    /// High frequency filter setting in Hz.
    pub high_frequency_filter: f64,
    /// AC line frequency in Hz.
    pub ac_line_frequency: f64,
}

impl Default for SegmentDefaults {
    fn default() -> Self {
        Self {
            channel_description: "ts_channel".to_string(),
            session_description: "ts_session".to_string(),
            reference_description: "None".to_string(),
            acquisition_channel_number: 1,
            notch_filter_frequency: 0.0,
            low_frequency_filter: 1.0,
            high_frequency_filter: 10.0,
            ac_line_frequency: 0.0,
        }
    }
}

/// Defaults for the recording metadata of every created segment.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingDefaults {
    /// Daylight saving start (uutc).
    pub dst_start_time: i64,
    /// Daylight saving end (uutc).
    pub dst_end_time: i64,
    /// Offset from GMT in seconds.
    pub gmt_offset: i32,
    /// Subject first name.
    pub subject_name_1: String,
    /// Subject last name.
    pub subject_name_2: String,
    /// Subject identifier.
    pub subject_id: String,
    /// Recording location.
    pub recording_location: String,
}

impl Default for RecordingDefaults {
    fn default() -> Self {
        Self {
            dst_start_time: 0,
            dst_end_time: 0,
            gmt_offset: -6 * 3600,
            subject_name_1: "none".to_string(),
            subject_name_2: "none".to_string(),
            subject_id: "None".to_string(),
            recording_location: "P".to_string(),
        }
    }
}

/// Per-segment values filled in by the writer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SegmentFields {
    pub sampling_frequency: f64,
    pub recording_duration: i64,
    pub units_conversion_factor: f64,
    pub start_sample: u64,
}

/// Configuration for a [`crate::SessionWriter`].
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Block length for every channel, instead of deriving it from the
    /// sampling frequency.
    pub block_length: Option<i64>,

    /// Recording time offset written to segments and annotation records.
    pub record_offset: i64,

    /// Longest gap folded into a stored interval.
    pub gap_tolerance: GapTolerance,

    /// Unit label of written samples.
    pub data_units: String,

    /// Whether writes re-read channel metadata afterwards by default.
    /// Turning this off speeds up many small appends but leaves the
    /// overlap check working on stale end times.
    pub refresh_after_write: bool,

    /// Descriptive segment fields.
    pub segment_defaults: SegmentDefaults,

    /// Recording metadata fields.
    pub recording_defaults: RecordingDefaults,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            block_length: None,
            record_offset: 0,
            gap_tolerance: GapTolerance::SamplingFrequency,
            data_units: "uV".to_string(),
            refresh_after_write: true,
            segment_defaults: SegmentDefaults::default(),
            recording_defaults: RecordingDefaults::default(),
        }
    }
}

impl WriterConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a fixed block length.
    #[must_use]
    pub const fn block_length(mut self, length: i64) -> Self {
        self.block_length = Some(length);
        self
    }

    /// Sets the recording time offset.
    #[must_use]
    pub const fn record_offset(mut self, offset: i64) -> Self {
        self.record_offset = offset;
        self
    }

    /// Sets the gap tolerance.
    #[must_use]
    pub const fn gap_tolerance(mut self, tolerance: GapTolerance) -> Self {
        self.gap_tolerance = tolerance;
        self
    }

    /// Sets the unit label.
    #[must_use]
    pub fn data_units(mut self, units: impl Into<String>) -> Self {
        self.data_units = units.into();
        self
    }

    /// Sets whether writes refresh metadata by default.
    #[must_use]
    pub const fn refresh_after_write(mut self, value: bool) -> Self {
        self.refresh_after_write = value;
        self
    }

    /// Sets the segment description defaults.
    #[must_use]
    pub fn segment_defaults(mut self, defaults: SegmentDefaults) -> Self {
        self.segment_defaults = defaults;
        self
    }

    /// Sets the recording metadata defaults.
    #[must_use]
    pub fn recording_defaults(mut self, defaults: RecordingDefaults) -> Self {
        self.recording_defaults = defaults;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if the block length is not
    /// positive or the unit label is empty or too long.
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(length) = self.block_length {
            if length <= 0 {
                return Err(CoreError::invalid_config(format!(
                    "block length must be positive, got {length}"
                )));
            }
        }
        if self.data_units.is_empty() || self.data_units.len() > MAX_UNITS_LEN {
            return Err(CoreError::invalid_config(format!(
                "unit label must be 1..={MAX_UNITS_LEN} bytes, got {:?}",
                self.data_units
            )));
        }
        Ok(())
    }

    /// Builds fresh segment metadata from the defaults.
    pub(crate) fn segment_metadata(&self, fields: SegmentFields) -> SegmentMetadata {
        let d = &self.segment_defaults;
        SegmentMetadata {
            channel_description: d.channel_description.clone(),
            session_description: d.session_description.clone(),
            recording_duration: fields.recording_duration,
            reference_description: d.reference_description.clone(),
            acquisition_channel_number: d.acquisition_channel_number,
            sampling_frequency: fields.sampling_frequency,
            notch_filter_frequency: d.notch_filter_frequency,
            low_frequency_filter: d.low_frequency_filter,
            high_frequency_filter: d.high_frequency_filter,
            ac_line_frequency: d.ac_line_frequency,
            units_conversion_factor: fields.units_conversion_factor,
            units_description: self.data_units.clone(),
            start_sample: fields.start_sample,
        }
    }

    /// Builds fresh recording metadata from the defaults.
    pub(crate) fn recording_metadata(&self) -> RecordingMetadata {
        let d = &self.recording_defaults;
        RecordingMetadata {
            recording_time_offset: self.record_offset,
            dst_start_time: d.dst_start_time,
            dst_end_time: d.dst_end_time,
            gmt_offset: d.gmt_offset,
            subject_name_1: d.subject_name_1.clone(),
            subject_name_2: d.subject_name_2.clone(),
            subject_id: d.subject_id.clone(),
            recording_location: d.recording_location.clone(),
        }
    }
}
