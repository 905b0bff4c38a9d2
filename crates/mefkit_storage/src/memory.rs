//! In-memory storage engine for testing.

use crate::engine::StorageEngine;
use crate::error::StorageResult;
use crate::session::SessionState;
use crate::types::{
    Annotation, ChannelBasicInfo, Credentials, RecordingMetadata, SegmentMetadata, TimeRange,
};
use parking_lot::RwLock;
use std::sync::Arc;

/// An in-memory storage engine.
///
/// This engine keeps the whole session in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral sessions that don't need persistence
///
/// # Shared Handles
///
/// Cloning an `InMemoryEngine` yields another handle to the *same* session,
/// so a test can hand one clone to a writer and inspect the session through
/// the other.
///
/// # Example
///
/// ```rust
/// use mefkit_storage::{InMemoryEngine, StorageEngine};
///
/// let engine = InMemoryEngine::new();
/// assert!(engine.read_basic_info().unwrap().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryEngine {
    state: Arc<RwLock<SessionState>>,
}

impl InMemoryEngine {
    /// Creates a new empty, unprotected session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty session protected by the given passwords.
    #[must_use]
    pub fn with_credentials(credentials: &Credentials) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::with_credentials(credentials))),
        }
    }

    /// Returns the names of all channels in the session.
    #[must_use]
    pub fn channel_names(&self) -> Vec<String> {
        self.state.read().channel_names()
    }

    /// Clears all data from the session, keeping its passwords.
    pub fn clear(&mut self) {
        self.state.write().clear_data();
    }

    /// Checks the access password without touching the session.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::AccessDenied`] on mismatch.
    pub fn authorize(&self, credentials: &Credentials) -> StorageResult<()> {
        self.state.read().authorize_access(credentials)
    }
}

impl StorageEngine for InMemoryEngine {
    fn read_basic_info(&self) -> StorageResult<Vec<ChannelBasicInfo>> {
        Ok(self.state.read().basic_info())
    }

    fn segment_count(&self, channel: &str) -> StorageResult<usize> {
        self.state.read().segment_count(channel)
    }

    fn create_segment(
        &mut self,
        channel: &str,
        segment: usize,
        credentials: &Credentials,
        start_uutc: i64,
        end_uutc: i64,
        segment_metadata: &SegmentMetadata,
        recording_metadata: &RecordingMetadata,
    ) -> StorageResult<()> {
        self.state.write().create_segment(
            channel,
            segment,
            credentials,
            start_uutc,
            end_uutc,
            segment_metadata,
            recording_metadata,
        )
    }

    fn write_segment_samples(
        &mut self,
        channel: &str,
        segment: usize,
        credentials: &Credentials,
        block_length: i64,
        samples: &[i32],
    ) -> StorageResult<()> {
        self.state
            .write()
            .write_segment_samples(channel, segment, credentials, block_length, samples)
    }

    fn append_segment_samples(
        &mut self,
        channel: &str,
        segment: usize,
        credentials: &Credentials,
        start_uutc: i64,
        end_uutc: i64,
        block_length: i64,
        samples: &[i32],
    ) -> StorageResult<()> {
        self.state.write().append_segment_samples(
            channel,
            segment,
            credentials,
            start_uutc,
            end_uutc,
            block_length,
            samples,
        )
    }

    fn read_samples(
        &self,
        channels: &[String],
        range: TimeRange,
    ) -> StorageResult<Vec<Vec<Option<i32>>>> {
        self.state.read().read_samples(channels, range)
    }

    fn read_records(&self, channel: Option<&str>) -> StorageResult<Vec<Annotation>> {
        self.state.read().read_records(channel)
    }

    fn write_records(
        &mut self,
        credentials: &Credentials,
        start_uutc: i64,
        end_uutc: i64,
        record_offset: i64,
        records: &[Annotation],
        channel: Option<&str>,
    ) -> StorageResult<()> {
        self.state.write().write_records(
            credentials,
            start_uutc,
            end_uutc,
            record_offset,
            records,
            channel,
        )
    }

    fn reload(&mut self) -> StorageResult<()> {
        // Memory is always current
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        // In-memory engine has no pending writes
        Ok(())
    }
}
