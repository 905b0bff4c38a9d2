//! Storage engine trait definition.

use crate::error::StorageResult;
use crate::types::{
    Annotation, ChannelBasicInfo, Credentials, RecordingMetadata, SegmentMetadata, TimeRange,
};

/// A segmented sample store for one session.
///
/// Engines durably keep quantized samples, segment metadata and annotation
/// records. They do not decide *what* to write: gap carving, precision and
/// segment selection belong to the caller.
///
/// # Invariants
///
/// - Segments of a channel are created with indices `0, 1, 2, ...` in order
/// - Only the last segment of a channel accepts samples
/// - `read_basic_info` reflects every successful mutating call made before it
/// - Mutating calls check the supplied [`Credentials`] against the session
///
/// # Implementors
///
/// - [`super::InMemoryEngine`] - For testing
/// - [`super::FileEngine`] - For persistent sessions
pub trait StorageEngine: Send + Sync {
    /// Returns the summary of every channel holding at least one segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    fn read_basic_info(&self) -> StorageResult<Vec<ChannelBasicInfo>>;

    /// Returns the number of segments of `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::ChannelNotFound`] for unknown channels.
    fn segment_count(&self, channel: &str) -> StorageResult<usize>;

    /// Creates segment `segment` of `channel`, creating the channel if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `segment` is not the channel's next segment index
    /// - `end_uutc < start_uutc`
    /// - the credentials do not allow writing
    #[allow(clippy::too_many_arguments)]
    fn create_segment(
        &mut self,
        channel: &str,
        segment: usize,
        credentials: &Credentials,
        start_uutc: i64,
        end_uutc: i64,
        segment_metadata: &SegmentMetadata,
        recording_metadata: &RecordingMetadata,
    ) -> StorageResult<()>;

    /// Writes the first samples of a freshly created segment, starting at
    /// the segment's start time.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment does not exist, is not the last
    /// segment, already holds samples, or `block_length` is not positive.
    fn write_segment_samples(
        &mut self,
        channel: &str,
        segment: usize,
        credentials: &Credentials,
        block_length: i64,
        samples: &[i32],
    ) -> StorageResult<()>;

    /// Appends samples covering `[start_uutc, end_uutc)` to the last segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment does not exist, is not the last
    /// segment, the time range is inverted, or `block_length` is not positive.
    #[allow(clippy::too_many_arguments)]
    fn append_segment_samples(
        &mut self,
        channel: &str,
        segment: usize,
        credentials: &Credentials,
        start_uutc: i64,
        end_uutc: i64,
        block_length: i64,
        samples: &[i32],
    ) -> StorageResult<()>;

    /// Reads each channel over `range`, clipped to the channel's time span.
    ///
    /// Returns one slot per sample period on the channel's sample grid, so
    /// positions line up with time. Slots with no stored sample (gaps
    /// between written intervals) are `None`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::ChannelNotFound`] if any channel is unknown.
    fn read_samples(
        &self,
        channels: &[String],
        range: TimeRange,
    ) -> StorageResult<Vec<Vec<Option<i32>>>>;

    /// Reads the annotation records of a channel, or of the session if
    /// `channel` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NoRecords`] if nothing was ever written
    /// for that scope.
    fn read_records(&self, channel: Option<&str>) -> StorageResult<Vec<Annotation>>;

    /// Replaces the annotation records of a channel or of the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is unknown, the time range is
    /// inverted, or the credentials do not allow writing.
    #[allow(clippy::too_many_arguments)]
    fn write_records(
        &mut self,
        credentials: &Credentials,
        start_uutc: i64,
        end_uutc: i64,
        record_offset: i64,
        records: &[Annotation],
        channel: Option<&str>,
    ) -> StorageResult<()>;

    /// Re-synchronizes the engine's view of the session with its storage.
    ///
    /// Never writes. Mutations not yet flushed stay visible.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be re-read.
    fn reload(&mut self) -> StorageResult<()>;

    /// Makes all previous mutations durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    fn flush(&mut self) -> StorageResult<()>;
}
