//! Metadata Extraction Pipeline
//!
//! One entry point, [`extract`], turns a path on disk into a
//! [`ComicMetadata`] record. The pipeline is layered: filesystem facts are
//! unconditional, the filename seeds guessable fields, and the container's
//! own metadata (ComicInfo.xml or the PDF info dictionary) overrides the
//! guesses. Damage inside a recognized container degrades the record instead
//! of failing the file.

use std::fs;
use std::path::Path;


use time::OffsetDateTime;
use tracing::{debug, instrument, warn};

use longbox_archive::error::ErrorKind as ArchiveErrorKind;
use longbox_archive::{ContainerKind, Tools, backend, classify, pdf};

use crate::comicinfo;
use crate::cover;
use crate::error::{ErrorKind, Result};
use crate::filename;
use crate::models::{Author, ComicMetadata};

/// Case-insensitive basename of the metadata sidecar.
const SIDECAR_BASENAME: &str = "comicinfo.xml";

/// Extracts everything knowable about the comic at `path`.
///
/// Classification trusts file contents, not extensions; a ZIP named `.cbr`
/// is read as a ZIP (with a log line about the mislabel).
///
/// # Errors
///
/// - [`ErrorKind::NotFound`] when the file does not exist.
/// - [`ErrorKind::EmptyFile`] for zero-byte files.
/// - [`ErrorKind::Unreadable`] when the leading bytes cannot be read from an
///   existing file.
/// - [`ErrorKind::UnsupportedFormat`] when the content matches no known
///   container signature.
///
/// Any other failure (corrupt archive, broken sidecar, undecodable cover) is
/// logged and reflected as missing fields, never as an error.
#[instrument(skip(tools), fields(path = %path.display()))]
pub fn extract(path: &Path, tools: &Tools) -> Result<ComicMetadata> {
    let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let stat = match fs::metadata(&abs) {
        Ok(stat) => stat,
        Err(_) => exn::bail!(ErrorKind::NotFound(abs)),
    };
    if stat.len() == 0 {
        exn::bail!(ErrorKind::EmptyFile(abs));
    }
    let modified = stat
        .modified()
        .map(OffsetDateTime::from)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);

    let mut meta = ComicMetadata::new(abs.clone(), stat.len(), modified);
    seed_from_filename(&mut meta, &abs);

    let kind = match classify(&abs) {
        Ok(kind) => kind,
        Err(err) => match &*err {
            ArchiveErrorKind::EmptyFile(p) => exn::bail!(ErrorKind::EmptyFile(p.clone())),
            ArchiveErrorKind::NotFound(p) => exn::bail!(ErrorKind::NotFound(p.clone())),
            // Permission or device trouble on a file that stat'd fine; a
            // "not found" here would point anyone debugging the skip at
            // the wrong cause.
            _ => exn::bail!(ErrorKind::Unreadable(abs)),
        },
    };
    let labelled = ContainerKind::from_path(&abs);
    if labelled != ContainerKind::Unknown && labelled != kind {
        warn!(%labelled, actual = %kind, "extension does not match file contents");
    }

    match kind {
        ContainerKind::Unknown => {
            let ext = abs
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| "none".to_owned());
            exn::bail!(ErrorKind::UnsupportedFormat(ext));
        }
        ContainerKind::Pdf => extract_pdf(&mut meta, &abs, tools),
        ContainerKind::Zip | ContainerKind::Rar | ContainerKind::SevenZip => {
            extract_archive(&mut meta, &abs, kind);
        }
    }

    Ok(meta)
}

fn seed_from_filename(meta: &mut ComicMetadata, path: &Path) {
    let Some(stem) = path.file_stem().map(|s| s.to_string_lossy()) else {
        return;
    };
    let guess = filename::parse_stem(&stem);
    meta.title = guess.title;
    meta.series = guess.series;
    meta.issue_number = guess.issue_number;
    if let Some(year) = guess.year {
        meta.set_year(year);
    }
}

fn extract_archive(meta: &mut ComicMetadata, path: &Path, kind: ContainerKind) {
    let mut backend = match backend::open(path, kind) {
        Ok(backend) => backend,
        Err(error) => {
            warn!(%error, "could not open container, keeping filename metadata only");
            return;
        }
    };
    let entries = match backend.list_entries() {
        Ok(entries) => entries,
        Err(error) => {
            warn!(%error, "could not list container entries");
            return;
        }
    };

    if let Some(sidecar) = find_sidecar(&entries) {
        match backend.read_entry(&sidecar) {
            Ok(xml) => {
                if let Err(error) = comicinfo::apply(&xml, meta) {
                    warn!(%error, entry = sidecar, "ignoring unparsable sidecar");
                }
            }
            Err(error) => warn!(%error, entry = sidecar, "could not read sidecar"),
        }
    }

    let Some(entry) = cover::select_entry(&entries).map(str::to_owned) else {
        debug!("no page images in container, no cover stored");
        return;
    };
    match backend.read_entry(&entry) {
        Ok(raw) => {
            let cover = cover::process(raw, &entry);
            meta.set_cover(cover.bytes, cover.mime);
        }
        Err(error) => warn!(%error, entry, "could not read cover entry"),
    }
}

/// The sidecar may live at the root or inside a page directory; basename
/// match, case-insensitive.
fn find_sidecar(entries: &[String]) -> Option<String> {
    entries
        .iter()
        .find(|name| {
            name.rsplit(['/', '\\'])
                .next()
                .is_some_and(|base| base.eq_ignore_ascii_case(SIDECAR_BASENAME))
        })
        .cloned()
}

fn extract_pdf(meta: &mut ComicMetadata, path: &Path, tools: &Tools) {
    let document = match pdf::PdfDocument::open(path) {
        Ok(document) => document,
        Err(error) => {
            warn!(%error, "could not parse document, keeping filename metadata only");
            return;
        }
    };

    let info = document.info();
    if let Some(title) = info.title {
        meta.title = title;
    }
    if let Some(author) = info.author {
        // PDF convention separates multiple authors with semicolons. Roles
        // are not part of the info dictionary.
        for name in author.split(';').map(str::trim).filter(|n| !n.is_empty()) {
            meta.push_author(Author::new(name, None));
        }
    }
    if let Some(producer) = info.producer {
        meta.publisher = Some(producer);
    }
    if let Some(year) = info.creation_year {
        meta.set_year(year);
    }
    meta.page_count = Some(document.page_count());

    match pdf::rasterize_first_page(path, tools) {
        Ok(raw) => {
            let cover = cover::process(raw, "page-1.jpg");
            meta.set_cover(cover.bytes, cover.mime);
        }
        Err(error) => match &*error {
            ArchiveErrorKind::ToolUnavailable(tool) => {
                debug!(tool, "rasterizer unavailable, no cover stored");
            }
            _ => warn!(%error, "first page rasterization failed"),
        },
    }
}
