use crate::backend::ArchiveBackend;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sevenz_rust2::{Archive, Password, SevenZReader};
use std::fs::File;
use std::path::Path;

/// 7z-family backend (.cb7, .7z).
///
/// Entry names are captured from the archive header at open time; reads go
/// through [`SevenZReader`], which materializes the selected entry in
/// memory (7z solid blocks rule out cheap per-entry streaming).
pub struct SevenZipBackend {
    names: Vec<String>,
    reader: SevenZReader<File>,
}

impl std::fmt::Debug for SevenZipBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SevenZipBackend")
            .field("entries", &self.names.len())
            .finish_non_exhaustive()
    }
}

impl SevenZipBackend {
    /// Parse the archive header and prepare a reader.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::Corrupted`] if the header cannot be parsed. Encrypted
    /// archives are out of scope and surface the same way.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let archive = Archive::open(path).or_raise(|| ErrorKind::Corrupted)?;
        let names = archive
            .files
            .iter()
            .filter(|entry| !entry.is_directory() && entry.has_stream())
            .map(|entry| entry.name().to_string())
            .collect();
        let reader = SevenZReader::open(path, Password::empty()).or_raise(|| ErrorKind::Corrupted)?;
        Ok(Self { names, reader })
    }
}

impl ArchiveBackend for SevenZipBackend {
    fn list_entries(&mut self) -> Result<Vec<String>> {
        Ok(self.names.clone())
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        if !self.names.iter().any(|n| n == name) {
            exn::bail!(ErrorKind::EntryNotFound(name.to_string()));
        }
        self.reader.read_file(name).or_raise(|| ErrorKind::Corrupted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_archive_is_corrupted() {
        let file = tempfile::Builder::new().suffix(".cb7").tempfile().unwrap();
        std::fs::write(file.path(), b"7z\xBC\xAF\x27\x1C\x00\x04").unwrap();
        let err = SevenZipBackend::open(file.path()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Corrupted));
    }
}
