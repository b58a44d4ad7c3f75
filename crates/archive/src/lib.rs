//! Container format detection and read access for comic book files.
//!
//! This crate answers two questions for the extraction pipeline:
//!
//! - **What is this file, really?** [`classify`] sniffs magic bytes and
//!   returns a [`ContainerKind`], correcting for mislabeled extensions
//!   (a `.cbz` that is secretly RAR is classified as RAR).
//! - **What's inside it?** [`backend::open`] hands back an
//!   [`ArchiveBackend`](backend::ArchiveBackend) for the ZIP/RAR/7z
//!   families; [`pdf`] covers the document-shaped odd one out.
//!
//! Failure modes are normalized across libraries: a broken container is
//! [`Corrupted`](error::ErrorKind::Corrupted), a missing external binary is
//! [`ToolUnavailable`](error::ErrorKind::ToolUnavailable), and neither is
//! meant to abort a batch scan.

pub mod backend;
pub mod error;
mod kind;
pub mod pdf;
mod tools;

pub use crate::kind::{ContainerKind, classify};
pub use crate::tools::Tools;
