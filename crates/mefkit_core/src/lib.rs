//! # mefkit Core
//!
//! Write path for segmented multichannel recordings.
//!
//! This crate provides:
//! - Precision inference and float to fixed-point conversion
//! - Gap detection and interval merging
//! - A per-channel metadata cache mirroring the storage engine
//! - [`SessionWriter`], which turns float buffers into segment create and
//!   append calls, and merges annotation records
//! - [`SessionReader`], which reads samples back in physical units
//! - Pink noise generation for test signals
//!
//! ## Invariants
//!
//! - Channels are append-only: a write must start at or after the
//!   channel's stored end
//! - A channel's sampling frequency and scale factor are fixed by its first
//!   write
//! - Rejected writes make no storage call
//!
//! ## Example
//!
//! ```rust
//! use mefkit_core::{SessionWriter, WriteRejection, WriteRequest, WriterConfig};
//! use mefkit_storage::{Credentials, InMemoryEngine};
//!
//! let mut writer =
//!     SessionWriter::open(InMemoryEngine::new(), WriterConfig::default(), Credentials::none())
//!         .unwrap();
//!
//! let samples = [1.0, 2.0, f64::NAN, 4.0];
//! let outcome = writer
//!     .write(&WriteRequest::new("eeg", &samples, 0, 1.0))
//!     .unwrap();
//! assert!(outcome.is_written());
//!
//! // Starting inside the stored data is refused.
//! let outcome = writer
//!     .write(&WriteRequest::new("eeg", &samples, 1_000_000, 1.0))
//!     .unwrap();
//! assert!(matches!(
//!     outcome.rejection(),
//!     Some(WriteRejection::OverlapsExistingData { .. })
//! ));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod annotations;
mod config;
mod error;
pub mod intervals;
mod metadata;
pub mod quantize;
mod reader;
pub mod signal;
mod writer;

pub use annotations::{combine, CombinedRecords};
pub use config::{RecordingDefaults, SegmentDefaults, WriterConfig, MAX_UNITS_LEN};
pub use error::{CoreError, CoreResult};
pub use intervals::{GapTolerance, Interval};
pub use metadata::{block_length_for, ChannelInfo, ChannelMetadataCache, HIGH_RATE_THRESHOLD};
pub use quantize::{InferredPrecision, QuantizedBuffer};
pub use reader::{ChannelSelector, SessionReader};
pub use writer::{SessionWriter, WriteOutcome, WriteRejection, WriteRequest, WriteSummary};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
