use crate::error::{ErrorKind, Result, map_io_error};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
const RAR4_MAGIC: [u8; 7] = [0x52, 0x61, 0x72, 0x21, 0x1A, 0x07, 0x00];
const RAR5_MAGIC: [u8; 7] = [0x52, 0x61, 0x72, 0x21, 0x1A, 0x07, 0x01];
const SEVENZ_MAGIC: [u8; 6] = [0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];
const PDF_MAGIC: [u8; 5] = [0x25, 0x50, 0x44, 0x46, 0x2D]; // %PDF-

/// Longest magic sequence is RAR's seven bytes; one spare for luck.
const SNIFF_LENGTH: usize = 8;

/// A supported container format for comic book files.
///
/// Defaults to [`Unknown`](Self::Unknown): a file that matches no known
/// signature is not dispatched to any backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// ZIP-family container (.cbz, .zip)
    Zip,
    /// RAR-family container (.cbr, .rar), both 4.x and 5.0+ signatures
    Rar,
    /// 7z-family container (.cb7, .7z)
    SevenZip,
    /// PDF document (.pdf)
    Pdf,
    /// No recognized signature
    #[default]
    Unknown,
}

impl Display for ContainerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            ContainerKind::Zip => "zip",
            ContainerKind::Rar => "rar",
            ContainerKind::SevenZip => "7z",
            ContainerKind::Pdf => "pdf",
            ContainerKind::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

impl From<&[u8]> for ContainerKind {
    fn from(value: &[u8]) -> Self {
        ContainerKind::from_magic_bytes(value)
    }
}

impl ContainerKind {
    /// Detect the container format from magic bytes.
    ///
    /// Returns the `Unknown` variant if no signature matches or if the input
    /// is too short to match any of them.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        // RAR5 before RAR4: they share a six-byte prefix.
        if bytes.starts_with(&RAR5_MAGIC) || bytes.starts_with(&RAR4_MAGIC) {
            return ContainerKind::Rar;
        }
        if bytes.starts_with(&ZIP_MAGIC) {
            return ContainerKind::Zip;
        }
        if bytes.starts_with(&SEVENZ_MAGIC) {
            return ContainerKind::SevenZip;
        }
        if bytes.starts_with(&PDF_MAGIC) {
            return ContainerKind::Pdf;
        }
        ContainerKind::Unknown
    }

    /// The kind a file's extension *claims* it to be.
    ///
    /// Extensions lie often enough (re-packed CBRs named `.cbz` are endemic
    /// in the wild) that this is only used to detect and log the mislabel;
    /// dispatch always follows [`classify`].
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| match ext.to_lowercase().as_str() {
                "cbz" | "zip" => ContainerKind::Zip,
                "cbr" | "rar" => ContainerKind::Rar,
                "cb7" | "7z" => ContainerKind::SevenZip,
                "pdf" => ContainerKind::Pdf,
                _ => ContainerKind::Unknown,
            })
            .unwrap_or(ContainerKind::Unknown)
    }

    /// Whether this kind is served by an [`ArchiveBackend`](crate::backend::ArchiveBackend).
    ///
    /// PDF is not: it has its own document path (see [`pdf`](crate::pdf)).
    #[must_use]
    pub fn is_archive(&self) -> bool {
        matches!(self, ContainerKind::Zip | ContainerKind::Rar | ContainerKind::SevenZip)
    }
}

/// Classify a file by its leading bytes, ignoring whatever the extension says.
///
/// # Errors
///
/// - [`ErrorKind::NotFound`] if the path cannot be opened.
/// - [`ErrorKind::EmptyFile`] for a zero-byte file; nothing downstream should
///   touch a backend for one of those.
pub fn classify(path: impl AsRef<Path>) -> Result<ContainerKind> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| map_io_error(e, path))?;
    let mut prefix = Vec::with_capacity(SNIFF_LENGTH);
    file.take(SNIFF_LENGTH as u64)
        .read_to_end(&mut prefix)
        .map_err(ErrorKind::Io)?;
    if prefix.is_empty() {
        exn::bail!(ErrorKind::EmptyFile(path.to_path_buf()));
    }
    Ok(ContainerKind::from_magic_bytes(&prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[rstest]
    #[case(b"PK\x03\x04rest-of-archive", ContainerKind::Zip)]
    #[case(b"Rar!\x1A\x07\x00data", ContainerKind::Rar)]
    #[case(b"Rar!\x1A\x07\x01\x00data", ContainerKind::Rar)]
    #[case(b"7z\xBC\xAF\x27\x1Cdata", ContainerKind::SevenZip)]
    #[case(b"%PDF-1.7\n", ContainerKind::Pdf)]
    #[case(b"<!DOCTYPE html>", ContainerKind::Unknown)]
    #[case(b"", ContainerKind::Unknown)]
    #[case(b"PK", ContainerKind::Unknown)]
    #[case(b"Rar!\x1A\x07\x02", ContainerKind::Unknown)]
    fn test_from_magic_bytes(#[case] bytes: &[u8], #[case] expected: ContainerKind) {
        assert_eq!(ContainerKind::from_magic_bytes(bytes), expected);
        assert_eq!(<&[u8] as Into<ContainerKind>>::into(bytes), expected);
    }

    #[rstest]
    #[case("issue-001.cbz", ContainerKind::Zip)]
    #[case("issue-001.CBZ", ContainerKind::Zip)]
    #[case("archive.zip", ContainerKind::Zip)]
    #[case("issue-001.cbr", ContainerKind::Rar)]
    #[case("archive.rar", ContainerKind::Rar)]
    #[case("issue-001.cb7", ContainerKind::SevenZip)]
    #[case("archive.7z", ContainerKind::SevenZip)]
    #[case("scan.pdf", ContainerKind::Pdf)]
    #[case("notes.txt", ContainerKind::Unknown)]
    #[case("no-extension", ContainerKind::Unknown)]
    fn test_from_path(#[case] name: &str, #[case] expected: ContainerKind) {
        assert_eq!(ContainerKind::from_path(name), expected);
    }

    #[test]
    fn test_classify_ignores_extension() {
        // The mislabeled-archive case: ZIP bytes wearing a .cbr extension.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mislabeled.cbr");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"PK\x03\x04\x14\x00\x00\x00").unwrap();
        drop(file);
        assert_eq!(classify(&path).unwrap(), ContainerKind::Zip);
        assert_eq!(ContainerKind::from_path(&path), ContainerKind::Rar);
    }

    #[test]
    fn test_classify_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.cbz");
        File::create(&path).unwrap();
        let err = classify(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::EmptyFile(_)));
    }

    #[test]
    fn test_classify_missing_file() {
        let err = classify("/definitely/not/here.cbz").unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_classify_short_file() {
        // Shorter than any signature, but not empty: classifies as Unknown.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stub.cbz");
        std::fs::write(&path, b"PK").unwrap();
        assert_eq!(classify(&path).unwrap(), ContainerKind::Unknown);
    }
}
