//! Row types and the public catalog models they convert into.
//!
//! Row structs mirror SQLite's type system (integers, floats, text) and stay
//! private to the crate. Everything a caller sees has already been converted
//! into honest Rust types, with conversion failures reported as
//! [`ErrorKind::InvalidData`](crate::error::ErrorKind::InvalidData).

use exn::ResultExt;
use sqlx::FromRow;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{ErrorKind, Result};

/// A creator credit as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credit {
    pub name: String,
    /// Lowercase role name ("writer", "penciller", ...), when known.
    pub role: Option<String>,
}

/// A fully hydrated catalog entry for one comic file.
#[derive(Debug, Clone, PartialEq)]
pub struct ComicRecord {
    pub id: i64,
    pub title: String,
    pub series: Option<String>,
    pub subseries: Option<String>,
    pub publisher: Option<String>,
    pub issue_number: Option<String>,
    pub volume: Option<u32>,
    pub year: Option<u16>,
    pub authors: Vec<Credit>,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub web: Option<String>,
    pub page_count: Option<u32>,
    pub format: Option<String>,
    pub black_and_white: bool,
    pub manga: bool,
    pub characters: Vec<String>,
    pub teams: Vec<String>,
    pub locations: Vec<String>,
    pub scan_info: Option<String>,
    pub story_arc: Option<String>,
    pub story_arc_number: Option<String>,
    pub series_group: Option<String>,
    pub alternate_series: Option<String>,
    pub alternate_number: Option<String>,
    pub alternate_count: Option<u32>,
    pub issue_count: Option<u32>,
    pub age_rating: Option<String>,
    pub community_rating: Option<f32>,
    pub main_character_or_team: Option<String>,
    pub review: Option<String>,
    pub file_path: String,
    pub file_size: u64,
    pub file_modified: OffsetDateTime,
    pub has_cover: bool,
    pub cover_image_type: Option<String>,
}

/// A light projection for listings; no blobs, no long text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComicSummary {
    pub id: i64,
    pub title: String,
    pub series: Option<String>,
    pub issue_number: Option<String>,
    pub year: Option<u16>,
    pub publisher: Option<String>,
    pub file_path: String,
    pub file_size: u64,
}

/// Aggregate counts over the whole catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogStats {
    pub comics: u64,
    pub series: u64,
    pub publishers: u64,
    pub authors: u64,
    pub total_bytes: u64,
}

#[derive(Debug, FromRow)]
pub(crate) struct ComicRow {
    pub id: i64,
    pub title: String,
    pub series: Option<String>,
    pub subseries: Option<String>,
    pub publisher: Option<String>,
    pub issue_number: Option<String>,
    pub volume: Option<i64>,
    pub year: Option<i64>,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub web: Option<String>,
    pub page_count: Option<i64>,
    pub format: Option<String>,
    pub black_and_white: i64,
    pub manga: i64,
    pub characters: Option<String>,
    pub teams: Option<String>,
    pub locations: Option<String>,
    pub scan_info: Option<String>,
    pub story_arc: Option<String>,
    pub story_arc_number: Option<String>,
    pub series_group: Option<String>,
    pub alternate_series: Option<String>,
    pub alternate_number: Option<String>,
    pub alternate_count: Option<i64>,
    pub issue_count: Option<i64>,
    pub age_rating: Option<String>,
    pub community_rating: Option<f64>,
    pub main_character_or_team: Option<String>,
    pub review: Option<String>,
    pub file_path: String,
    pub file_size: i64,
    pub file_modified: String,
    pub has_cover: i64,
    pub cover_image_type: Option<String>,
}

impl TryFrom<ComicRow> for ComicRecord {
    type Error = crate::error::Error;

    fn try_from(row: ComicRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            title: row.title,
            series: row.series,
            subseries: row.subseries,
            publisher: row.publisher,
            issue_number: row.issue_number,
            volume: opt_u32(row.volume, "volume")?,
            year: opt_u16(row.year, "year")?,
            // Filled in by the repository from the join table.
            authors: Vec::new(),
            summary: row.summary,
            notes: row.notes,
            genre: row.genre,
            language: row.language,
            web: row.web,
            page_count: opt_u32(row.page_count, "page count")?,
            format: row.format,
            black_and_white: row.black_and_white != 0,
            manga: row.manga != 0,
            characters: split_list(row.characters),
            teams: split_list(row.teams),
            locations: split_list(row.locations),
            scan_info: row.scan_info,
            story_arc: row.story_arc,
            story_arc_number: row.story_arc_number,
            series_group: row.series_group,
            alternate_series: row.alternate_series,
            alternate_number: row.alternate_number,
            alternate_count: opt_u32(row.alternate_count, "alternate count")?,
            issue_count: opt_u32(row.issue_count, "issue count")?,
            age_rating: row.age_rating,
            community_rating: row.community_rating.map(|r| r as f32),
            main_character_or_team: row.main_character_or_team,
            review: row.review,
            file_path: row.file_path,
            file_size: u64::try_from(row.file_size)
                .or_raise(|| ErrorKind::InvalidData("file size"))?,
            file_modified: OffsetDateTime::parse(&row.file_modified, &Rfc3339)
                .or_raise(|| ErrorKind::InvalidData("timestamp"))?,
            has_cover: row.has_cover != 0,
            cover_image_type: row.cover_image_type,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct SummaryRow {
    pub id: i64,
    pub title: String,
    pub series: Option<String>,
    pub issue_number: Option<String>,
    pub year: Option<i64>,
    pub publisher: Option<String>,
    pub file_path: String,
    pub file_size: i64,
}

impl TryFrom<SummaryRow> for ComicSummary {
    type Error = crate::error::Error;

    fn try_from(row: SummaryRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            title: row.title,
            series: row.series,
            issue_number: row.issue_number,
            year: opt_u16(row.year, "year")?,
            publisher: row.publisher,
            file_path: row.file_path,
            file_size: u64::try_from(row.file_size)
                .or_raise(|| ErrorKind::InvalidData("file size"))?,
        })
    }
}

fn opt_u32(value: Option<i64>, what: &'static str) -> Result<Option<u32>> {
    value
        .map(|v| u32::try_from(v).or_raise(|| ErrorKind::InvalidData(what)))
        .transpose()
}

fn opt_u16(value: Option<i64>, what: &'static str) -> Result<Option<u16>> {
    value
        .map(|v| u16::try_from(v).or_raise(|| ErrorKind::InvalidData(what)))
        .transpose()
}

pub(crate) fn join_list<'a>(items: impl IntoIterator<Item = &'a String>) -> Option<String> {
    let joined = items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    (!joined.is_empty()).then_some(joined)
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}
