//! SQLite catalog database for comic collection metadata.
//!
//! This crate persists extracted comic metadata. The database is not the
//! source of truth: the comic files themselves are. If the database is
//! deleted, it can be rebuilt by rescanning the library.
//!
//! # Architecture
//! The catalog normalizes shared entities and keys everything else by file:
//! - **Comics**: one row per file, keyed by absolute path, carrying the
//!   extracted fields and the cover thumbnail blob.
//! - **Publishers, series, subseries, authors**: deduplicated by name and
//!   referenced from comics; author links carry the creator's role.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::{CatalogStats, ComicRecord, ComicSummary, Credit};
pub use crate::repo::Repository;
