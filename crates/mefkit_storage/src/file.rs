//! File-based storage engine for persistent sessions.

use crate::engine::StorageEngine;
use crate::error::{StorageError, StorageResult};
use crate::session::SessionState;
use crate::types::{
    Annotation, ChannelBasicInfo, Credentials, RecordingMetadata, SegmentMetadata, TimeRange,
};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the snapshot file inside a session directory.
pub const SNAPSHOT_FILE: &str = "session.cbor";

/// How [`FileEngine::open`] treats an existing session directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create a new session; fail if one exists.
    Create,
    /// Open an existing session; fail if none exists.
    Open,
    /// Open an existing session or create a new one.
    CreateOrOpen,
    /// Delete any existing session and create a new one.
    Overwrite,
}

/// A file-based storage engine.
///
/// The session lives in a directory holding a single CBOR snapshot
/// ([`SNAPSHOT_FILE`]). Mutations are applied in memory and written out by
/// [`StorageEngine::flush`], [`StorageEngine::reload`] or on drop.
///
/// # Durability
///
/// - The snapshot is written to a temporary file, synced, then renamed
///   over the previous snapshot
/// - A crash between flushes loses the unflushed mutations
///
/// # Example
///
/// ```no_run
/// use mefkit_storage::{Credentials, FileEngine, OpenMode, StorageEngine};
/// use std::path::Path;
///
/// let mut engine =
///     FileEngine::open(Path::new("recording.mefk"), OpenMode::CreateOrOpen, &Credentials::none())
///         .unwrap();
/// engine.flush().unwrap();
/// ```
#[derive(Debug)]
pub struct FileEngine {
    dir: PathBuf,
    state: SessionState,
    dirty: bool,
}

impl FileEngine {
    /// Opens or creates the session directory at `dir`.
    ///
    /// New sessions are protected by the passwords in `credentials`;
    /// existing sessions require a matching access password.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `mode` forbids the existing (or missing) session
    /// - the access password does not match
    /// - the snapshot cannot be read or decoded
    pub fn open(dir: &Path, mode: OpenMode, credentials: &Credentials) -> StorageResult<Self> {
        let snapshot = dir.join(SNAPSHOT_FILE);
        let exists = snapshot.exists();

        match mode {
            OpenMode::Create if exists => return Err(StorageError::SessionExists(dir.to_path_buf())),
            OpenMode::Open if !exists => {
                return Err(StorageError::SessionNotFound(dir.to_path_buf()))
            }
            OpenMode::Overwrite if dir.exists() => {
                debug!(path = %dir.display(), "removing existing session");
                fs::remove_dir_all(dir)?;
            }
            _ => {}
        }

        if snapshot.exists() {
            let state = Self::load(&snapshot)?;
            state.authorize_access(credentials)?;
            debug!(path = %dir.display(), "opened session");
            return Ok(Self {
                dir: dir.to_path_buf(),
                state,
                dirty: false,
            });
        }

        fs::create_dir_all(dir)?;
        let mut engine = Self {
            dir: dir.to_path_buf(),
            state: SessionState::with_credentials(credentials),
            dirty: true,
        };
        engine.persist()?;
        debug!(path = %dir.display(), "created session");
        Ok(engine)
    }

    /// Returns the session directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Returns true if mutations are waiting to be flushed.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn load(snapshot: &Path) -> StorageResult<SessionState> {
        let reader = BufReader::new(File::open(snapshot)?);
        ciborium::from_reader(reader).map_err(|e| StorageError::Codec(e.to_string()))
    }

    fn persist(&mut self) -> StorageResult<()> {
        let tmp = self.dir.join(format!("{SNAPSHOT_FILE}.tmp"));
        let mut writer = BufWriter::new(File::create(&tmp)?);
        ciborium::into_writer(&self.state, &mut writer)
            .map_err(|e| StorageError::Codec(e.to_string()))?;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        fs::rename(&tmp, self.dir.join(SNAPSHOT_FILE))?;
        self.dirty = false;
        debug!(path = %self.dir.display(), "session snapshot written");
        Ok(())
    }

    fn mutate<T>(&mut self, op: impl FnOnce(&mut SessionState) -> StorageResult<T>) -> StorageResult<T> {
        let result = op(&mut self.state)?;
        self.dirty = true;
        Ok(result)
    }
}

impl StorageEngine for FileEngine {
    fn read_basic_info(&self) -> StorageResult<Vec<ChannelBasicInfo>> {
        Ok(self.state.basic_info())
    }

    fn segment_count(&self, channel: &str) -> StorageResult<usize> {
        self.state.segment_count(channel)
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
        self.mutate(|state| {
            state.create_segment(
                channel,
                segment,
                credentials,
                start_uutc,
                end_uutc,
                segment_metadata,
                recording_metadata,
            )
        })
    }

    fn write_segment_samples(
        &mut self,
        channel: &str,
        segment: usize,
        credentials: &Credentials,
        block_length: i64,
        samples: &[i32],
    ) -> StorageResult<()> {
        self.mutate(|state| {
            state.write_segment_samples(channel, segment, credentials, block_length, samples)
        })
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
        self.mutate(|state| {
            state.append_segment_samples(
                channel,
                segment,
                credentials,
                start_uutc,
                end_uutc,
                block_length,
                samples,
            )
        })
    }

    fn read_samples(
        &self,
        channels: &[String],
        range: TimeRange,
    ) -> StorageResult<Vec<Vec<Option<i32>>>> {
        self.state.read_samples(channels, range)
    }

    fn read_records(&self, channel: Option<&str>) -> StorageResult<Vec<Annotation>> {
        self.state.read_records(channel)
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
        self.mutate(|state| {
            state.write_records(credentials, start_uutc, end_uutc, record_offset, records, channel)
        })
    }

    fn reload(&mut self) -> StorageResult<()> {
        // Unflushed mutations exist only in memory; the snapshot is older.
        if self.dirty {
            return Ok(());
        }
        self.state = Self::load(&self.dir.join(SNAPSHOT_FILE))?;
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        if self.dirty {
            self.persist()?;
        }
        Ok(())
    }
}

impl Drop for FileEngine {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to flush session on drop: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn meta() -> SegmentMetadata {
        SegmentMetadata {
            sampling_frequency: 10.0,
            units_conversion_factor: 0.1,
            units_description: "uV".into(),
            ..SegmentMetadata::default()
        }
    }

    fn write_one_segment(engine: &mut FileEngine, creds: &Credentials) {
        engine
            .create_segment("eeg", 0, creds, 0, 1_000_000, &meta(), &RecordingMetadata::default())
            .unwrap();
        engine
            .write_segment_samples("eeg", 0, creds, 100, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10])
            .unwrap();
    }

    #[test]
    fn file_session_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.mefk");
        let creds = Credentials::none();
        {
            let mut engine = FileEngine::open(&path, OpenMode::Create, &creds).unwrap();
            write_one_segment(&mut engine, &creds);
            assert!(engine.is_dirty());
            engine.flush().unwrap();
            assert!(!engine.is_dirty());
        }

        let engine = FileEngine::open(&path, OpenMode::Open, &creds).unwrap();
        let info = engine.read_basic_info().unwrap();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].number_of_samples, 10);
        let data = engine
            .read_samples(&["eeg".to_string()], TimeRange::new(0, 1_000_000))
            .unwrap();
        assert_eq!(data[0], (1..=10).map(Some).collect::<Vec<_>>());
    }

    #[test]
    fn file_drop_flushes_pending_mutations() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.mefk");
        let creds = Credentials::none();
        {
            let mut engine = FileEngine::open(&path, OpenMode::Create, &creds).unwrap();
            write_one_segment(&mut engine, &creds);
        }
        let engine = FileEngine::open(&path, OpenMode::Open, &creds).unwrap();
        assert_eq!(engine.segment_count("eeg").unwrap(), 1);
    }

    #[test]
    fn file_open_modes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.mefk");
        let creds = Credentials::none();

        assert!(matches!(
            FileEngine::open(&path, OpenMode::Open, &creds),
            Err(StorageError::SessionNotFound(_))
        ));
        {
            let mut engine = FileEngine::open(&path, OpenMode::CreateOrOpen, &creds).unwrap();
            write_one_segment(&mut engine, &creds);
        }
        assert!(matches!(
            FileEngine::open(&path, OpenMode::Create, &creds),
            Err(StorageError::SessionExists(_))
        ));

        let engine = FileEngine::open(&path, OpenMode::Overwrite, &creds).unwrap();
        assert!(engine.read_basic_info().unwrap().is_empty());
    }

    #[test]
    fn file_open_checks_access_password() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.mefk");
        let creds = Credentials::new("w", "r");
        drop(FileEngine::open(&path, OpenMode::Create, &creds).unwrap());

        assert!(matches!(
            FileEngine::open(&path, OpenMode::Open, &Credentials::none()),
            Err(StorageError::AccessDenied)
        ));
        assert!(FileEngine::open(&path, OpenMode::Open, &Credentials::none().with_level_2("r")).is_ok());
    }

    #[test]
    fn file_reload_keeps_unflushed_state_without_writing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.mefk");
        let creds = Credentials::none();
        let mut engine = FileEngine::open(&path, OpenMode::Create, &creds).unwrap();
        write_one_segment(&mut engine, &creds);

        engine.reload().unwrap();
        assert!(engine.is_dirty());
        assert_eq!(engine.segment_count("eeg").unwrap(), 1);
        let on_disk = FileEngine::open(&path, OpenMode::Open, &creds).unwrap();
        assert!(on_disk.read_basic_info().unwrap().is_empty());

        engine.flush().unwrap();
        engine.reload().unwrap();
        assert!(!engine.is_dirty());
        assert_eq!(engine.segment_count("eeg").unwrap(), 1);
    }
}
