use crate::backend::ArchiveBackend;
use crate::error::{ErrorKind, Result, map_io_error};
use exn::ResultExt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

// Upper bound on the buffer reserved from a header-declared entry size.
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

fn bounded_capacity(declared: u64) -> usize {
    usize::try_from(declared).unwrap_or(usize::MAX).min(MAX_PREALLOC)
}

/// ZIP-family backend (.cbz, .zip).
///
/// The only backend that supports true in-memory streaming reads of a single
/// entry; also by far the most common comic container.
pub struct ZipBackend {
    archive: ZipArchive<File>,
}

impl std::fmt::Debug for ZipBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipBackend").field("entries", &self.archive.len()).finish()
    }
}

impl ZipBackend {
    /// Open and parse the central directory.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::Corrupted`] if the central directory cannot be parsed
    /// (truncated download, not actually a ZIP despite the signature).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| map_io_error(e, path))?;
        let archive = ZipArchive::new(file).or_raise(|| ErrorKind::Corrupted)?;
        Ok(Self { archive })
    }
}

impl ArchiveBackend for ZipBackend {
    fn list_entries(&mut self) -> Result<Vec<String>> {
        Ok(self
            .archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(str::to_owned)
            .collect())
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => exn::bail!(ErrorKind::EntryNotFound(name.to_string())),
            Err(_) => exn::bail!(ErrorKind::Corrupted),
        };
        // The declared size comes from an untrusted header, so only a
        // bounded amount is reserved up front; read_to_end grows past it.
        let mut buffer = Vec::with_capacity(bounded_capacity(entry.size()));
        // A short or checksum-failing read means the local file data is
        // damaged even though the central directory parsed fine.
        entry.read_to_end(&mut buffer).or_raise(|| ErrorKind::Corrupted)?;
        Ok(buffer)
    }
}
