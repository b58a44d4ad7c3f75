//! Candidate discovery.
//!
//! Enumerates every file under the scan root whose content could plausibly
//! be a comic, judged by extension alone. Content sniffing happens later,
//! per file, during extraction.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use longbox_archive::ContainerKind;

use crate::error::{ErrorKind, Result};

/// Enumerate comic candidates under `root`, sorted for deterministic
/// processing order.
///
/// Unreadable subdirectories are logged and skipped. Only a root that cannot
/// be walked at all is an error.
///
/// # Errors
///
/// [`ErrorKind::Discovery`] when `root` is not a readable directory.
pub fn discover(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        exn::bail!(ErrorKind::Discovery(root.to_path_buf()));
    }
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut candidates = Vec::new();
    for entry in WalkDir::new(root).max_depth(max_depth).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(%error, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if ContainerKind::from_path(entry.path()) == ContainerKind::Unknown {
            continue;
        }
        candidates.push(entry.into_path());
    }
    candidates.sort();
    debug!(root = %root.display(), count = candidates.len(), "discovery complete");
    Ok(candidates)
}
