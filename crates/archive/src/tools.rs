use std::path::{Path, PathBuf};

/// External tools resolved once at session start.
///
/// The only genuinely external dependency is the PDF rasterizer; archive
/// decoding is handled by linked libraries. Resolution happens exactly once
/// and the result travels by value; there are no process-global tool paths.
#[derive(Clone, Debug, Default)]
pub struct Tools {
    /// Absolute path to `pdftoppm`, if available on this host.
    pub pdftoppm: Option<PathBuf>,
}

impl Tools {
    /// Resolve tool locations, preferring an explicitly configured path over
    /// a `PATH` lookup.
    ///
    /// A missing rasterizer is warned about here, once, and never again per
    /// file: extraction simply proceeds without PDF covers.
    pub fn resolve(configured_pdftoppm: Option<&Path>) -> Self {
        let pdftoppm = configured_pdftoppm
            .map(Path::to_path_buf)
            .or_else(|| which::which("pdftoppm").ok());
        if pdftoppm.is_none() {
            tracing::warn!("pdftoppm not found; PDF covers will be skipped for this session");
        }
        Self { pdftoppm }
    }

    /// A toolless configuration, for tests and degraded sessions.
    #[must_use]
    pub fn none() -> Self {
        Self { pdftoppm: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_path_wins() {
        let configured = Path::new("/opt/poppler/bin/pdftoppm");
        let tools = Tools::resolve(Some(configured));
        assert_eq!(tools.pdftoppm.as_deref(), Some(configured));
    }

    #[test]
    fn test_none_has_no_tools() {
        assert!(Tools::none().pdftoppm.is_none());
    }
}
