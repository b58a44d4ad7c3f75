//! Archive backend trait and per-format adapters.
//!
//! One trait, three containers. Each adapter wraps a different archive
//! library and normalizes its failure modes into the crate's
//! [`ErrorKind`](crate::error::ErrorKind) vocabulary: a broken container is
//! `Corrupted`, a missing entry is `EntryNotFound`, and nothing in here is
//! ever supposed to take the whole batch down.

mod rar;
mod sevenz;
mod zip;

pub use self::rar::RarBackend;
pub use self::sevenz::SevenZipBackend;
pub use self::zip::ZipBackend;

use crate::ContainerKind;
use crate::error::{ErrorKind, Result};
use std::path::Path;

/// Read access to a comic book container.
///
/// The trait is deliberately synchronous: every library underneath is
/// blocking, so callers on an async runtime are expected to hop onto a
/// blocking worker for the duration of one file. Methods take `&mut self`
/// because some readers keep an internal cursor.
///
/// A backend instance is owned by the extraction call that opened it and
/// must be dropped on every exit path; nothing is cached across files.
pub trait ArchiveBackend: std::fmt::Debug {
    /// All entry names in the container, in whatever order the container
    /// stores them. Directory entries are excluded.
    fn list_entries(&mut self) -> Result<Vec<String>>;

    /// Read a single named entry into memory.
    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>>;

    /// Whether the container looks structurally sound.
    fn is_valid(&mut self) -> bool {
        self.list_entries().is_ok()
    }
}

/// Open the backend matching an already-sniffed [`ContainerKind`].
///
/// Dispatch happens exactly once, here; the returned object is used for the
/// rest of the extraction step without ever re-branching on format.
///
/// # Errors
///
/// [`ErrorKind::NotAnArchive`] for `Pdf`/`Unknown` kinds (those never reach
/// an archive backend), or whatever the adapter raises while opening.
pub fn open(path: impl AsRef<Path>, kind: ContainerKind) -> Result<Box<dyn ArchiveBackend>> {
    let path = path.as_ref();
    match kind {
        ContainerKind::Zip => Ok(Box::new(ZipBackend::open(path)?)),
        ContainerKind::Rar => Ok(Box::new(RarBackend::open(path)?)),
        ContainerKind::SevenZip => Ok(Box::new(SevenZipBackend::open(path)?)),
        ContainerKind::Pdf | ContainerKind::Unknown => {
            exn::bail!(ErrorKind::NotAnArchive(kind))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rejects_non_archives() {
        let err = open("whatever.pdf", ContainerKind::Pdf).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotAnArchive(ContainerKind::Pdf)));
        let err = open("whatever.bin", ContainerKind::Unknown).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotAnArchive(ContainerKind::Unknown)));
    }
}
