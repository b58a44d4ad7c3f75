//! Filename Heuristics
//!
//! Comics in the wild are mostly named `Series Name 012 (2004).cbz` or close
//! variants. This module pulls a year and an issue number out of a file stem
//! so that files with no embedded metadata still get a usable record.

use std::sync::LazyLock;

use regex::Regex;

/// A four-digit year in parentheses anywhere in the stem.
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d{4})\)").unwrap_or_else(|e| panic!("{e}")));

/// An issue number preceded by `#`, a space, or a dash, and followed by a
/// space, a dash, or the end of the stem. The bounded tail keeps it from
/// eating volume markers like `v01` or numbers inside words.
static ISSUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#\s-](\d+)(?:[\s-]|$)").unwrap_or_else(|e| panic!("{e}")));

/// What the stem alone tells us about a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameGuess {
    /// The stem with year and issue markers removed, or the raw stem when
    /// removal would leave nothing.
    pub title: String,
    /// Same as `title`, but absent when the stripped stem came up empty.
    pub series: Option<String>,
    /// Kept as a string so leading zeroes and half-issues survive.
    pub issue_number: Option<String>,
    pub year: Option<u16>,
}

/// Parses a file stem (no directory, no extension).
pub fn parse_stem(stem: &str) -> FilenameGuess {
    let mut remainder = stem.to_owned();

    // The match data is copied out before the stem is edited; the capture
    // handles borrow `remainder` for as long as they live.
    let mut year = None;
    if let Some(caps) = YEAR_RE.captures(&remainder) {
        let parsed = caps[1].parse::<u16>().ok();
        let range = caps.get(0).map(|m| m.range());
        if let Some(range) = range {
            remainder.replace_range(range, "");
            remainder = remainder.trim().to_owned();
        }
        year = parsed;
    }

    let mut issue_number = None;
    if let Some(caps) = ISSUE_RE.captures(&remainder) {
        let number = caps.get(1).map(|m| m.as_str().to_owned());
        let range = caps.get(0).map(|m| m.range());
        if let Some(range) = range {
            // The leading separator is part of the match. Substituting a
            // space (rather than deleting) keeps the words on either side
            // apart; trim handles the edges.
            remainder.replace_range(range, " ");
            remainder = remainder.trim().to_owned();
        }
        issue_number = number;
    }

    if remainder.is_empty() {
        FilenameGuess {
            title: stem.to_owned(),
            series: None,
            issue_number,
            year,
        }
    } else {
        FilenameGuess {
            title: remainder.clone(),
            series: Some(remainder),
            issue_number,
            year,
        }
    }
}
