//! Test fixtures and session helpers.
//!
//! Provides convenience functions for setting up test sessions
//! and common test scenarios.

use mefkit_core::{SessionReader, SessionWriter, WriteRequest, WriterConfig};
use mefkit_storage::{Credentials, FileEngine, InMemoryEngine, OpenMode};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

enum Backing {
    Memory(InMemoryEngine),
    File(TempDir),
}

/// A test session with automatic cleanup.
pub struct TestSession {
    /// The writer over the session.
    pub writer: SessionWriter,
    backing: Backing,
}

impl TestSession {
    /// Creates a new in-memory test session.
    pub fn memory() -> Self {
        Self::memory_with(WriterConfig::default())
    }

    /// Creates a new in-memory test session with a custom writer config.
    pub fn memory_with(config: WriterConfig) -> Self {
        let engine = InMemoryEngine::new();
        let writer = SessionWriter::open(engine.clone(), config, Credentials::none())
            .expect("Failed to open in-memory session");
        Self {
            writer,
            backing: Backing::Memory(engine),
        }
    }

    /// Creates a new file-based test session in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("session.mefk");
        let engine = FileEngine::open(&path, OpenMode::Create, &Credentials::none())
            .expect("Failed to create file session");
        let writer = SessionWriter::open(engine, WriterConfig::default(), Credentials::none())
            .expect("Failed to open file session");
        Self {
            writer,
            backing: Backing::File(temp_dir),
        }
    }

    /// Returns the session path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        match &self.backing {
            Backing::Memory(_) => None,
            Backing::File(dir) => Some(dir.path().join("session.mefk")),
        }
    }

    /// Opens a reader over everything written so far.
    pub fn reader(&mut self) -> SessionReader {
        self.writer.flush().expect("Failed to flush session");
        match &self.backing {
            Backing::Memory(engine) => {
                SessionReader::open(engine.clone()).expect("Failed to open reader")
            }
            Backing::File(dir) => {
                let engine = FileEngine::open(
                    &dir.path().join("session.mefk"),
                    OpenMode::Open,
                    &Credentials::none(),
                )
                .expect("Failed to reopen file session");
                SessionReader::open(engine).expect("Failed to open reader")
            }
        }
    }
}

impl std::ops::Deref for TestSession {
    type Target = SessionWriter;

    fn deref(&self) -> &Self::Target {
        &self.writer
    }
}

impl std::ops::DerefMut for TestSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.writer
    }
}

/// Runs a test with a temporary in-memory session.
///
/// # Example
///
/// ```rust
/// use mefkit_core::WriteRequest;
/// use mefkit_testkit::with_temp_session;
///
/// with_temp_session(|writer| {
///     let outcome = writer
///         .write(&WriteRequest::new("eeg", &[1.0, 2.0], 0, 1.0))
///         .unwrap();
///     assert!(outcome.is_written());
/// });
/// ```
pub fn with_temp_session<F, R>(f: F) -> R
where
    F: FnOnce(&mut SessionWriter) -> R,
{
    let mut session = TestSession::memory();
    f(&mut session.writer)
}

/// Runs a test with a temporary file-based session.
pub fn with_file_session<F, R>(f: F) -> R
where
    F: FnOnce(&mut SessionWriter, &Path) -> R,
{
    let mut session = TestSession::file();
    let path = session.path().expect("File session should have a path");
    f(&mut session.writer, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// A ramp `0, step, 2*step, ...` of `len` samples.
    pub fn ramp(len: usize, step: f64) -> Vec<f64> {
        (0..len).map(|i| i as f64 * step).collect()
    }

    /// Creates a session with `channel_count` channels `ch0, ch1, ...`, each
    /// holding `seconds` of a ramp at `sampling_frequency`, starting at 0.
    pub fn populated_session(
        channel_count: usize,
        sampling_frequency: f64,
        seconds: usize,
    ) -> TestSession {
        let mut session = TestSession::memory();
        let len = (sampling_frequency as usize) * seconds;
        let samples = ramp(len, 0.1);
        for i in 0..channel_count {
            let name = format!("ch{i}");
            let outcome = session
                .writer
                .write(&WriteRequest::new(&name, &samples, 0, sampling_frequency))
                .expect("Failed to write channel");
            assert!(outcome.is_written(), "populating write rejected");
        }
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_session() {
        let mut session = TestSession::memory();
        assert!(session.path().is_none());
        assert!(session.channels().is_empty());
        assert!(session.reader().channels().is_empty());
    }

    #[test]
    fn test_file_session_reader_sees_writes() {
        let mut session = TestSession::file();
        assert!(session.path().is_some());
        session
            .write(&WriteRequest::new("eeg", &[1.0, 2.0, 3.0], 0, 1.0))
            .unwrap();

        let reader = session.reader();
        assert_eq!(reader.channels(), vec!["eeg"]);
        assert_eq!(
            reader.read_raw("eeg", None).unwrap()[0],
            vec![Some(1000), Some(2000), Some(3000)]
        );
    }

    #[test]
    fn test_populated_scenario() {
        let session = scenarios::populated_session(3, 100.0, 2);
        assert_eq!(session.channels(), vec!["ch0", "ch1", "ch2"]);
        let info = session.channel_info("ch1").unwrap();
        assert_eq!(info.number_of_samples, 200);
        assert_eq!(info.end_time, 2_000_000);
    }
}
