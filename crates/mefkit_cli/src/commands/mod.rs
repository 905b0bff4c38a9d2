//! CLI command implementations.

pub mod annotate;
pub mod generate;
pub mod inspect;
pub mod read;
pub mod write;

use mefkit_core::WriteRejection;
use mefkit_storage::{Credentials, FileEngine, OpenMode, StorageResult};
use std::path::Path;
use thiserror::Error;

/// Errors raised by the CLI itself, on top of core and storage errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// A line of a sample file is not a number.
    #[error("line {line}: cannot parse sample {value:?}")]
    InvalidSample {
        /// 1-based line number.
        line: usize,
        /// Offending text.
        value: String,
    },

    /// The write was refused.
    #[error("write rejected: {0}")]
    Rejected(WriteRejection),

    /// Unknown output format.
    #[error("unknown format {0:?}, expected text or json")]
    UnknownFormat(String),
}

/// Output format shared by the reporting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl Format {
    /// Parses `text` or `json`.
    pub fn parse(value: &str) -> Result<Self, CliError> {
        match value {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(CliError::UnknownFormat(other.to_string())),
        }
    }
}

/// Opens the session directory with the given passwords.
pub fn open_session(
    path: &Path,
    mode: OpenMode,
    credentials: &Credentials,
) -> StorageResult<FileEngine> {
    FileEngine::open(path, mode, credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing() {
        assert_eq!(Format::parse("text").unwrap(), Format::Text);
        assert_eq!(Format::parse("json").unwrap(), Format::Json);
        assert!(matches!(Format::parse("xml"), Err(CliError::UnknownFormat(_))));
    }

    #[test]
    fn session_requires_access_password() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");
        let locked = Credentials::none().with_level_2("secret");
        drop(open_session(&path, OpenMode::Create, &locked).unwrap());

        assert!(open_session(&path, OpenMode::Open, &Credentials::none()).is_err());
        assert!(open_session(&path, OpenMode::Open, &locked).is_ok());
        assert!(open_session(&path, OpenMode::Create, &locked).is_err());
    }
}
