//! # mefkit Storage
//!
//! Segmented sample storage for mefkit sessions.
//!
//! This crate provides the storage-engine contract the mefkit write path
//! talks to, together with two engines. Engines persist quantized `i32`
//! sample blocks grouped into per-channel segments, the per-segment
//! metadata describing them, and annotation records.
//!
//! ## Design Principles
//!
//! - Engines store what they are told: they do not infer precision,
//!   detect gaps or decide between append and new segment
//! - Segments of a channel are created in strictly increasing index order
//!   and only the last segment accepts further samples
//! - Engines are the source of truth; callers cache basic info and must
//!   re-read it after mutating calls
//! - Must be `Send + Sync`
//!
//! ## Available Engines
//!
//! - [`InMemoryEngine`] - For testing and ephemeral sessions
//! - [`FileEngine`] - A session directory persisted as a CBOR snapshot
//!
//! ## Example
//!
//! ```rust
//! use mefkit_storage::{
//!     Credentials, InMemoryEngine, RecordingMetadata, SegmentMetadata, StorageEngine, TimeRange,
//! };
//!
//! let mut engine = InMemoryEngine::new();
//! let creds = Credentials::none();
//! let meta = SegmentMetadata {
//!     sampling_frequency: 10.0,
//!     ..SegmentMetadata::default()
//! };
//! engine
//!     .create_segment("eeg", 0, &creds, 0, 1_000_000, &meta, &RecordingMetadata::default())
//!     .unwrap();
//! engine
//!     .write_segment_samples("eeg", 0, &creds, 100, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10])
//!     .unwrap();
//!
//! let data = engine
//!     .read_samples(&["eeg".to_string()], TimeRange::new(0, 1_000_000))
//!     .unwrap();
//! assert_eq!(data[0].len(), 10);
//! assert_eq!(data[0][0], Some(1));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod file;
mod memory;
mod session;
mod types;

pub use engine::StorageEngine;
pub use error::{StorageError, StorageResult};
pub use file::{FileEngine, OpenMode, SNAPSHOT_FILE};
pub use memory::InMemoryEngine;
pub use types::{
    Annotation, ChannelBasicInfo, Credentials, RecordKind, RecordingMetadata, SegmentMetadata,
    TimeRange,
};
