//! Types exchanged between engines and their callers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A half-open `[start, end)` window of uutc timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive start (uutc).
    pub start: i64,
    /// Exclusive end (uutc).
    pub end: i64,
}

impl TimeRange {
    /// Creates a new time range.
    #[must_use]
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Returns true if `t` falls inside the range.
    #[must_use]
    pub const fn contains(&self, t: i64) -> bool {
        t >= self.start && t < self.end
    }

    /// Length of the range in microseconds (0 if inverted).
    #[must_use]
    pub const fn duration(&self) -> i64 {
        if self.end > self.start {
            self.end - self.start
        } else {
            0
        }
    }
}

/// Authoritative per-channel summary reported by an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelBasicInfo {
    /// Channel name.
    pub name: String,
    /// Distinct sampling frequencies across the channel's segments, in
    /// segment order.
    pub sampling_frequencies: Vec<f64>,
    /// Fixed-point divisor: stored integers times this factor give the
    /// physical value.
    pub units_conversion_factor: f64,
    /// Unit label, e.g. `uV`.
    pub units_description: String,
    /// Total number of stored samples over all segments.
    pub number_of_samples: u64,
    /// Start of the first segment (uutc).
    pub start_time: i64,
    /// End of the last stored data (uutc).
    pub end_time: i64,
}

impl ChannelBasicInfo {
    /// Sampling frequency of the first segment, NaN if the channel has none.
    #[must_use]
    pub fn sampling_frequency(&self) -> f64 {
        self.sampling_frequencies.first().copied().unwrap_or(f64::NAN)
    }
}

/// Per-segment technical metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SegmentMetadata {
    /// Free-text description of the channel.
    pub channel_description: String,
    /// Free-text description of the session.
    pub session_description: String,
    /// Recording duration in whole seconds.
    pub recording_duration: i64,
    /// Reference electrode description.
    pub reference_description: String,
    /// Acquisition channel number.
    pub acquisition_channel_number: i32,
    /// Sampling frequency in Hz.
    pub sampling_frequency: f64,
    /// Notch filter setting in Hz (0 = off).
    pub notch_filter_frequency: f64,
    /// Low frequency filter setting in Hz.
    pub low_frequency_filter: f64,
    /// High frequency filter setting in Hz.
    pub high_frequency_filter: f64,
    /// AC line frequency in Hz.
    pub ac_line_frequency: f64,
    /// Fixed-point divisor of the stored samples.
    pub units_conversion_factor: f64,
    /// Unit label.
    pub units_description: String,
    /// Index of this segment's first sample within the channel.
    pub start_sample: u64,
}

/// Per-segment recording (subject and time zone) metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordingMetadata {
    /// Offset applied to all stored times (uutc).
    pub recording_time_offset: i64,
    /// Daylight saving start (uutc, 0 = none).
    pub dst_start_time: i64,
    /// Daylight saving end (uutc, 0 = none).
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

/// Annotation record type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Free-text note.
    #[serde(rename = "Note")]
    Note,
    /// EDF+ annotation.
    #[serde(rename = "EDFA")]
    Edfa,
    /// Seizure marker.
    #[serde(rename = "Seiz")]
    Seizure,
    /// Cursor position.
    #[serde(rename = "Curs")]
    Cursor,
    /// Epoch marker.
    #[serde(rename = "Epoc")]
    Epoch,
}

impl RecordKind {
    /// The four-character tag of this kind.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Note => "Note",
            Self::Edfa => "EDFA",
            Self::Seizure => "Seiz",
            Self::Cursor => "Curs",
            Self::Epoch => "Epoc",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.tag())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "note" => Ok(Self::Note),
            "edfa" => Ok(Self::Edfa),
            "seiz" | "seizure" => Ok(Self::Seizure),
            "curs" | "cursor" => Ok(Self::Cursor),
            "epoc" | "epoch" => Ok(Self::Epoch),
            other => Err(format!("unknown record kind: {other}")),
        }
    }
}

/// A time-stamped annotation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Timestamp (uutc).
    pub time: i64,
    /// Record type tag.
    pub kind: RecordKind,
    /// Free text.
    pub text: String,
    /// Optional duration in microseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

impl Annotation {
    /// Creates a record without duration.
    pub fn new(time: i64, kind: RecordKind, text: impl Into<String>) -> Self {
        Self {
            time,
            kind,
            text: text.into(),
            duration: None,
        }
    }

    /// Creates a [`RecordKind::Note`] record.
    pub fn note(time: i64, text: impl Into<String>) -> Self {
        Self::new(time, RecordKind::Note, text)
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Session passwords.
///
/// Level 1 guards writes, level 2 guards every access. Passwords are wiped
/// from memory when the value is dropped.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    level_1: Option<String>,
    level_2: Option<String>,
}

impl Credentials {
    /// Credentials for an unprotected session.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates credentials with both passwords set.
    pub fn new(level_1: impl Into<String>, level_2: impl Into<String>) -> Self {
        Self {
            level_1: Some(level_1.into()),
            level_2: Some(level_2.into()),
        }
    }

    /// Sets the write password.
    #[must_use]
    pub fn with_level_1(mut self, password: impl Into<String>) -> Self {
        self.level_1 = Some(password.into());
        self
    }

    /// Sets the access password.
    #[must_use]
    pub fn with_level_2(mut self, password: impl Into<String>) -> Self {
        self.level_2 = Some(password.into());
        self
    }

    /// The write password, if any.
    #[must_use]
    pub fn level_1(&self) -> Option<&str> {
        self.level_1.as_deref()
    }

    /// The access password, if any.
    #[must_use]
    pub fn level_2(&self) -> Option<&str> {
        self.level_2.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("level_1", &self.level_1.as_ref().map(|_| "[REDACTED]"))
            .field("level_2", &self.level_2.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_range_is_half_open() {
        let range = TimeRange::new(10, 20);
        assert!(range.contains(10));
        assert!(range.contains(19));
        assert!(!range.contains(20));
        assert_eq!(range.duration(), 10);
        assert_eq!(TimeRange::new(20, 10).duration(), 0);
    }

    #[test]
    fn record_kind_parses_tags() {
        assert_eq!("Note".parse::<RecordKind>().unwrap(), RecordKind::Note);
        assert_eq!("EDFA".parse::<RecordKind>().unwrap(), RecordKind::Edfa);
        assert_eq!("seizure".parse::<RecordKind>().unwrap(), RecordKind::Seizure);
        assert!("bogus".parse::<RecordKind>().is_err());
        assert_eq!(RecordKind::Epoch.to_string(), "Epoc");
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials::new("secret1", "secret2");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(creds.level_1(), Some("secret1"));
    }

    #[test]
    fn basic_info_frequency_of_empty_channel_is_nan() {
        let info = ChannelBasicInfo {
            name: "x".into(),
            sampling_frequencies: vec![],
            units_conversion_factor: 1.0,
            units_description: "uV".into(),
            number_of_samples: 0,
            start_time: 0,
            end_time: 0,
        };
        assert!(info.sampling_frequency().is_nan());
    }
}
