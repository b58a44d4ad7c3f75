use std::collections::BTreeSet;
use std::path::PathBuf;

use time::OffsetDateTime;

use super::author::Author;

/// Bounds on a plausible publication year. Anything outside is discarded
/// rather than recorded.
pub const YEAR_MIN: u16 = 1900;
pub const YEAR_MAX: u16 = 2100;

/// Everything the extractor can learn about a single comic file.
///
/// Field population is best-effort and layered: filename heuristics seed the
/// record, then container-specific sources (ComicInfo.xml, PDF document info)
/// override them. Fields that no source mentions stay at their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ComicMetadata {
    pub title: String,
    pub series: Option<String>,
    pub subseries: Option<String>,
    pub issue_number: Option<String>,
    pub volume: Option<u32>,
    pub year: Option<u16>,
    pub publisher: Option<String>,
    pub authors: Vec<Author>,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub web: Option<String>,
    pub page_count: Option<u32>,
    pub format: Option<String>,
    pub black_and_white: bool,
    pub manga: bool,
    pub characters: BTreeSet<String>,
    pub teams: BTreeSet<String>,
    pub locations: BTreeSet<String>,
    pub scan_info: Option<String>,
    pub story_arc: Option<String>,
    pub story_arc_number: Option<String>,
    pub series_group: Option<String>,
    pub alternate_series: Option<String>,
    pub alternate_number: Option<String>,
    pub alternate_count: Option<u32>,
    pub count: Option<u32>,
    pub age_rating: Option<String>,
    pub community_rating: Option<f32>,
    pub main_character_or_team: Option<String>,
    pub review: Option<String>,
    pub file_path: PathBuf,
    pub file_size: u64,
    pub file_modified: OffsetDateTime,
    pub cover_image: Option<Vec<u8>>,
    pub cover_image_type: Option<String>,
}

impl ComicMetadata {
    /// Creates an empty record carrying only the filesystem facts.
    pub fn new(file_path: PathBuf, file_size: u64, file_modified: OffsetDateTime) -> Self {
        Self {
            title: String::new(),
            series: None,
            subseries: None,
            issue_number: None,
            volume: None,
            year: None,
            publisher: None,
            authors: Vec::new(),
            summary: None,
            notes: None,
            genre: None,
            language: None,
            web: None,
            page_count: None,
            format: None,
            black_and_white: false,
            manga: false,
            characters: BTreeSet::new(),
            teams: BTreeSet::new(),
            locations: BTreeSet::new(),
            scan_info: None,
            story_arc: None,
            story_arc_number: None,
            series_group: None,
            alternate_series: None,
            alternate_number: None,
            alternate_count: None,
            count: None,
            age_rating: None,
            community_rating: None,
            main_character_or_team: None,
            review: None,
            file_path,
            file_size,
            file_modified,
            cover_image: None,
            cover_image_type: None,
        }
    }

    /// Records a publication year, discarding implausible values.
    pub fn set_year(&mut self, year: u16) {
        if (YEAR_MIN..=YEAR_MAX).contains(&year) {
            self.year = Some(year);
        }
    }

    /// Records the cover image. Bytes and MIME type are set together so one
    /// is never present without the other.
    pub fn set_cover(&mut self, bytes: Vec<u8>, mime: impl Into<String>) {
        self.cover_image = Some(bytes);
        self.cover_image_type = Some(mime.into());
    }

    /// Appends an author credit, ignoring blank names.
    pub fn push_author(&mut self, author: Author) {
        if !author.name.trim().is_empty() {
            self.authors.push(author);
        }
    }
}
