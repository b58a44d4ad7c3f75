//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// `Corrupted` and `ToolUnavailable` are expected to be absorbed by the
/// extraction pipeline (skip the step, keep the batch going); the rest are
/// genuine per-file failures.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The file does not exist or could not be opened.
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The file is zero bytes; there is nothing to classify or open.
    #[display("file is empty: {}", _0.display())]
    EmptyFile(#[error(not(source))] PathBuf),
    /// The container opened but its structure is broken (bad checksum,
    /// truncated stream, mangled central directory).
    #[display("archive is corrupted or truncated")]
    Corrupted,
    /// The named entry does not exist within the container.
    #[display("no such entry in archive: {_0}")]
    EntryNotFound(#[error(not(source))] String),
    /// A required external binary is missing on this host. Degrade, never
    /// fail the batch over it.
    #[display("external tool unavailable: {_0}")]
    ToolUnavailable(#[error(not(source))] &'static str),
    /// The sniffed kind has no archive backend (PDF and unknown containers
    /// take a different path).
    #[display("not an archive container: {_0}")]
    NotAnArchive(#[error(not(source))] crate::ContainerKind),
    /// An I/O operation failed.
    #[display("I/O error")]
    Io(std::io::Error),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io(_))
    }
}

pub(crate) fn map_io_error(e: std::io::Error, path: &std::path::Path) -> ErrorKind {
    match e.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
        _ => ErrorKind::Io(e),
    }
}
