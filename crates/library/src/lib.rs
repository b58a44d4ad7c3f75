//! Directory scanning sessions.
//!
//! A [`scan::ScanSession`] walks one library directory, extracts metadata
//! from every comic it finds, commits each record to the catalog, and
//! reports progress as an async event stream. Sessions are cancellable
//! between files via a [`scan::StopHandle`]; everything committed before the
//! stop stays committed.

pub mod error;
pub mod scan;

pub use crate::error::{Error, ErrorKind, Result};
