//! Error types for mefkit core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in mefkit core operations.
///
/// Time-ordering and sampling-frequency violations on the write path are
/// not errors: they are reported as [`crate::WriteOutcome::Rejected`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage engine error, passed through uninterpreted.
    #[error("storage error: {0}")]
    Storage(#[from] mefkit_storage::StorageError),

    /// A planned interval does not fit the quantized buffer.
    #[error("shape mismatch: interval [{start}, {stop}) outside buffer of {len} samples")]
    ShapeMismatch {
        /// Interval start sample.
        start: usize,
        /// Interval stop sample.
        stop: usize,
        /// Length of the quantized buffer.
        len: usize,
    },

    /// The sampling frequency of a write is not a positive finite number.
    #[error("invalid sampling frequency {sampling_frequency} for channel {channel}")]
    InvalidSamplingFrequency {
        /// Target channel.
        channel: String,
        /// Requested sampling frequency in Hz.
        sampling_frequency: f64,
    },

    /// The block length planned for a new segment is not positive.
    #[error("invalid block length {block_length} for channel {channel}")]
    InvalidBlockLength {
        /// Target channel.
        channel: String,
        /// Planned block length in samples.
        block_length: i64,
    },

    /// Channel not present in the session.
    #[error("channel not found: {name}")]
    ChannelNotFound {
        /// Channel name or index that was requested.
        name: String,
    },

    /// Invalid writer configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// The stored session uses a feature this crate does not handle.
    #[error("unsupported: {message}")]
    Unsupported {
        /// Description of the unsupported feature.
        message: String,
    },

    /// Session is closed.
    #[error("session is closed")]
    SessionClosed,
}

impl CoreError {
    /// Creates a channel not found error.
    pub fn channel_not_found(name: impl Into<String>) -> Self {
        Self::ChannelNotFound { name: name.into() }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an unsupported feature error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }
}
