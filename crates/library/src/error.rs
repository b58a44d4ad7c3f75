//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The scan root could not be enumerated at all. The only error that
    /// ends a session.
    #[display("could not enumerate scan root: {}", _0.display())]
    Discovery(#[error(not(source))] PathBuf),
    /// The catalog rejected a record. Per file this demotes to a skip; it is
    /// never session-fatal.
    #[display("catalog write failed")]
    Catalog,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Catalog)
    }
}
