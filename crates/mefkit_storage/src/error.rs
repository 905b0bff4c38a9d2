//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The session snapshot could not be encoded or decoded.
    #[error("snapshot codec error: {0}")]
    Codec(String),

    /// The requested channel does not exist in the session.
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    /// The requested segment does not exist.
    #[error("segment {segment} not found in channel {channel}")]
    SegmentNotFound {
        /// Channel name.
        channel: String,
        /// Requested segment index.
        segment: usize,
    },

    /// A segment was created out of index order.
    #[error("segment {actual} out of order in channel {channel}: next index is {expected}")]
    SegmentOutOfOrder {
        /// Channel name.
        channel: String,
        /// The only index that may be created next.
        expected: usize,
        /// The index that was requested.
        actual: usize,
    },

    /// Samples were sent to a segment that is no longer the last one.
    #[error("segment {segment} of channel {channel} is sealed: last segment is {last}")]
    SegmentSealed {
        /// Channel name.
        channel: String,
        /// Requested segment index.
        segment: usize,
        /// Index of the last segment, the only one accepting samples.
        last: usize,
    },

    /// Initial segment data was written to a segment that already holds samples.
    #[error("segment {segment} of channel {channel} already holds samples")]
    SegmentNotEmpty {
        /// Channel name.
        channel: String,
        /// Segment index.
        segment: usize,
    },

    /// End timestamp lies before start timestamp.
    #[error("invalid time range: end {end} is before start {start}")]
    InvalidTimeRange {
        /// Start timestamp (uutc).
        start: i64,
        /// End timestamp (uutc).
        end: i64,
    },

    /// Segments need a positive, finite sampling frequency.
    #[error("invalid sampling frequency: {0}")]
    InvalidSamplingFrequency(f64),

    /// Block length must be positive.
    #[error("invalid block length: {0}")]
    InvalidBlockLength(i64),

    /// No annotation records are stored for the requested scope.
    #[error("no records stored for {scope}")]
    NoRecords {
        /// `session` or the channel name.
        scope: String,
    },

    /// The supplied credentials do not open this session.
    #[error("access denied: credentials do not match the session")]
    AccessDenied,

    /// A session already exists at the given path.
    #[error("session already exists: {0}")]
    SessionExists(PathBuf),

    /// No session exists at the given path.
    #[error("session not found: {0}")]
    SessionNotFound(PathBuf),

    /// The stored session is corrupted.
    #[error("session corrupted: {0}")]
    Corrupted(String),
}
