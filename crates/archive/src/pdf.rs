//! PDF document access: metadata from the Info dictionary, plus first-page
//! rasterization for covers.
//!
//! PDFs are not archives (they have no entries to list), so they get their
//! own path instead of an [`ArchiveBackend`](crate::backend::ArchiveBackend)
//! impl. Metadata comes from the trailer's Info dictionary via `lopdf`;
//! covers come from shelling out to poppler's `pdftoppm`, since rendering a
//! page is far outside what this crate should attempt natively.

use crate::Tools;
use crate::error::{ErrorKind, Result, map_io_error};
use exn::ResultExt;
use lopdf::{Document, Object};
use std::path::Path;
use std::process::Command;
use tracing::instrument;

/// Fields pulled from a PDF's document information dictionary.
///
/// All optional; scanned comics frequently carry none of them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DocInfo {
    pub title: Option<String>,
    /// Author string as written; multiple authors are conventionally
    /// separated by semicolons.
    pub author: Option<String>,
    pub producer: Option<String>,
    /// Year from the `D:YYYY…` creation date, already sanity-bounded.
    pub creation_year: Option<u16>,
}

/// An opened PDF document.
pub struct PdfDocument {
    document: Document,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument").field("pages", &self.page_count()).finish()
    }
}

impl PdfDocument {
    /// Load and parse the document structure.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::Corrupted`] if the cross-reference table or trailer is
    /// unparsable.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let document = Document::load(path.as_ref()).or_raise(|| ErrorKind::Corrupted)?;
        Ok(Self { document })
    }

    /// Number of pages, for the record's page count.
    #[must_use]
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Extract the Info dictionary fields, tolerating any subset of them
    /// being absent or oddly encoded.
    #[must_use]
    pub fn info(&self) -> DocInfo {
        let Some(dict) = self.info_dict() else {
            return DocInfo::default();
        };
        DocInfo {
            title: self.string_value(dict, b"Title"),
            author: self.string_value(dict, b"Author"),
            producer: self.string_value(dict, b"Producer"),
            creation_year: self
                .string_value(dict, b"CreationDate")
                .as_deref()
                .and_then(parse_creation_year),
        }
    }

    fn info_dict(&self) -> Option<&lopdf::Dictionary> {
        let info = self.document.trailer.get(b"Info").ok()?;
        let object = match info {
            Object::Reference(id) => self.document.get_object(*id).ok()?,
            direct => direct,
        };
        object.as_dict().ok()
    }

    fn string_value(&self, dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
        let object = match dict.get(key).ok()? {
            Object::Reference(id) => self.document.get_object(*id).ok()?,
            direct => direct,
        };
        match object {
            Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
            _ => None,
        }
        .filter(|s| !s.is_empty())
    }
}

/// Decode a PDF text string: UTF-16BE when the BOM says so, otherwise
/// treated as (lossy) UTF-8, which also covers plain ASCII PDFDocEncoding.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units).trim().to_string()
    } else {
        String::from_utf8_lossy(bytes).trim().to_string()
    }
}

/// Pull a sane year out of a `D:YYYYMMDDHHmmSS…` creation date.
///
/// Anything outside 1900–2100 is treated as garbage (comics predating 1900
/// do not come with PDF metadata).
pub fn parse_creation_year(raw: &str) -> Option<u16> {
    let digits = raw.strip_prefix("D:").unwrap_or(raw);
    let year: u16 = digits.get(..4)?.parse().ok()?;
    (1900..=2100).contains(&year).then_some(year)
}

/// Render page 1 to JPEG bytes via `pdftoppm` in a scoped temp directory.
///
/// The temp directory (and the rendered page in it) is removed when this
/// function returns, on every path.
///
/// # Errors
///
/// - [`ErrorKind::ToolUnavailable`] when no rasterizer was resolved.
/// - [`ErrorKind::Corrupted`] when the rasterizer exits non-zero or
///   produces no output (damaged or password-protected document).
#[instrument(skip(tools), fields(path = %path.as_ref().display()))]
pub fn rasterize_first_page(path: impl AsRef<Path>, tools: &Tools) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let Some(pdftoppm) = tools.pdftoppm.as_deref() else {
        exn::bail!(ErrorKind::ToolUnavailable("pdftoppm"));
    };
    let dir = tempfile::tempdir().map_err(ErrorKind::Io)?;
    let prefix = dir.path().join("page");
    let output = Command::new(pdftoppm)
        .args(["-jpeg", "-f", "1", "-l", "1"])
        .arg(path)
        .arg(&prefix)
        .output()
        .map_err(|e| map_io_error(e, path))?;
    if !output.status.success() {
        tracing::debug!(status = %output.status, "pdftoppm failed");
        exn::bail!(ErrorKind::Corrupted);
    }
    // Output lands as `page-1.jpg` (zero-padding depends on the poppler
    // version), so take whatever single file appeared.
    let rendered = std::fs::read_dir(dir.path())
        .map_err(ErrorKind::Io)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|p| p.extension().is_some_and(|ext| ext == "jpg"));
    match rendered {
        Some(page) => std::fs::read(&page).map_err(|e| map_io_error(e, &page).into()),
        None => exn::bail!(ErrorKind::Corrupted),
    }
}
