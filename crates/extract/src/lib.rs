//! # Comic Metadata Extraction
//!
//! Turns comic book files (CBZ, CBR, CB7, PDF) into structured
//! [`ComicMetadata`] records. Sources are layered by trustworthiness:
//! filesystem facts always, filename heuristics as a seed, and embedded
//! metadata (a `ComicInfo.xml` sidecar or the PDF information dictionary) on
//! top. A cover thumbnail is selected, bounded, and stored inline.
//!
//! ```no_run
//! use longbox_archive::Tools;
//! use longbox_extract::extract;
//!
//! let tools = Tools::resolve(None);
//! let meta = extract("comics/Watchmen 001 (1986).cbz".as_ref(), &tools)?;
//! println!("{} [{:?}]", meta.title, meta.year);
//! # Ok::<(), longbox_extract::Error>(())
//! ```

pub mod comicinfo;
pub mod cover;
pub mod error;
mod extract;
pub mod filename;
mod models;

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::extract::extract;
pub use crate::models::{Author, ComicMetadata, Role, YEAR_MAX, YEAR_MIN};
