//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// All but `MalformedSidecar` can escape [`extract`](crate::extract): they
/// mean "skip this file". Everything that goes wrong mid-extraction (corrupt
/// entries, undecodable covers, malformed sidecars) is absorbed and shows up
/// as a less complete record plus a log line, never as an error.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file doesn't exist or can't be stat'd.
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The file is zero bytes long.
    #[display("file is empty: {}", _0.display())]
    EmptyFile(#[error(not(source))] PathBuf),
    /// The file exists but its leading bytes could not be read (permission
    /// denied, device error, a directory wearing an archive extension).
    #[display("file could not be read: {}", _0.display())]
    Unreadable(#[error(not(source))] PathBuf),
    /// The file matches no supported container signature.
    #[display("unsupported container format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// A `ComicInfo.xml` was present but unparsable. Absorbed internally;
    /// exposed so the sidecar parser can be tested in isolation.
    #[display("malformed ComicInfo.xml sidecar")]
    MalformedSidecar,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A file that is missing, empty, unreadable, or unrecognized will
        // almost always be the same the second time around.
        false
    }
}
