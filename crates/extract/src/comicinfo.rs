//! ComicInfo.xml Sidecar Parsing
//!
//! `ComicInfo.xml` is the de-facto metadata sidecar embedded in comic
//! archives. Parsing is deliberately forgiving: unknown elements are skipped,
//! unparsable numbers are dropped, and only a document that cannot be
//! tokenized at all is reported as malformed.

use std::collections::BTreeSet;

use exn::ResultExt;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::models::{Author, ComicMetadata, Role};

/// Applies the fields of a `ComicInfo.xml` document onto `meta`.
///
/// Values present in the document override whatever the filename heuristics
/// seeded; elements that are absent or empty leave the existing values alone.
#[instrument(skip_all, fields(len = xml.len()))]
pub fn apply(xml: &[u8], meta: &mut ComicMetadata) -> Result<()> {
    let text = String::from_utf8_lossy(xml);
    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(true);

    // Creator elements accumulate here so a record with any credited names
    // replaces the (always empty) filename-derived author list atomically.
    let mut authors: Vec<Author> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .or_raise(|| ErrorKind::MalformedSidecar)?;
        match event {
            Event::Start(start) => {
                let tag = start.name().as_ref().to_vec();
                // Only leaf fields get their text consumed here. Container
                // elements, the root `<ComicInfo>` first among them, fall
                // through so the loop visits their children.
                if !is_known_field(&tag) {
                    continue;
                }
                let value = reader
                    .read_text(start.name())
                    .or_raise(|| ErrorKind::MalformedSidecar)?
                    .trim()
                    .to_owned();
                if value.is_empty() {
                    continue;
                }
                match tag.as_slice() {
                    b"Title" => meta.title = value,
                    b"Series" => meta.series = Some(value),
                    b"Number" => meta.issue_number = Some(value),
                    b"Volume" => set_u32(&mut meta.volume, &value),
                    b"Year" => {
                        if let Ok(year) = value.parse::<u16>() {
                            meta.set_year(year);
                        }
                    }
                    b"Publisher" => meta.publisher = Some(value),
                    b"Summary" => meta.summary = Some(value),
                    b"Notes" => meta.notes = Some(value),
                    b"Genre" => meta.genre = Some(value),
                    b"LanguageISO" => meta.language = Some(value),
                    b"Web" => meta.web = Some(value),
                    b"PageCount" => set_u32(&mut meta.page_count, &value),
                    b"Format" => meta.format = Some(value),
                    b"BlackAndWhite" => meta.black_and_white = truthy(&value),
                    b"Manga" => meta.manga = truthy(&value),
                    b"Characters" => meta.characters = split_list(&value),
                    b"Teams" => meta.teams = split_list(&value),
                    b"Locations" => meta.locations = split_list(&value),
                    b"ScanInformation" => meta.scan_info = Some(value),
                    b"StoryArc" => meta.story_arc = Some(value),
                    b"StoryArcNumber" => meta.story_arc_number = Some(value),
                    b"SeriesGroup" => meta.series_group = Some(value),
                    b"AlternateSeries" => meta.alternate_series = Some(value),
                    b"AlternateNumber" => meta.alternate_number = Some(value),
                    b"AlternateCount" => set_u32(&mut meta.alternate_count, &value),
                    b"Count" => set_u32(&mut meta.count, &value),
                    b"AgeRating" => meta.age_rating = Some(value),
                    b"CommunityRating" => {
                        if let Ok(rating) = value.parse::<f32>() {
                            meta.community_rating = Some(rating);
                        }
                    }
                    b"MainCharacterOrTeam" => meta.main_character_or_team = Some(value),
                    b"Review" => meta.review = Some(value),
                    b"Writer" => push_credits(&mut authors, &value, Role::Writer),
                    b"Penciller" => push_credits(&mut authors, &value, Role::Penciller),
                    b"Inker" => push_credits(&mut authors, &value, Role::Inker),
                    b"Colorist" => push_credits(&mut authors, &value, Role::Colorist),
                    b"Letterer" => push_credits(&mut authors, &value, Role::Letterer),
                    b"CoverArtist" => push_credits(&mut authors, &value, Role::CoverArtist),
                    b"Editor" => push_credits(&mut authors, &value, Role::Editor),
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !authors.is_empty() {
        meta.authors = authors;
    }
    Ok(())
}

fn is_known_field(tag: &[u8]) -> bool {
    matches!(
        tag,
        b"Title"
            | b"Series"
            | b"Number"
            | b"Volume"
            | b"Year"
            | b"Publisher"
            | b"Summary"
            | b"Notes"
            | b"Genre"
            | b"LanguageISO"
            | b"Web"
            | b"PageCount"
            | b"Format"
            | b"BlackAndWhite"
            | b"Manga"
            | b"Characters"
            | b"Teams"
            | b"Locations"
            | b"ScanInformation"
            | b"StoryArc"
            | b"StoryArcNumber"
            | b"SeriesGroup"
            | b"AlternateSeries"
            | b"AlternateNumber"
            | b"AlternateCount"
            | b"Count"
            | b"AgeRating"
            | b"CommunityRating"
            | b"MainCharacterOrTeam"
            | b"Review"
            | b"Writer"
            | b"Penciller"
            | b"Inker"
            | b"Colorist"
            | b"Letterer"
            | b"CoverArtist"
            | b"Editor"
    )
}

fn set_u32(slot: &mut Option<u32>, value: &str) {
    if let Ok(parsed) = value.parse::<u32>() {
        *slot = Some(parsed);
    }
}

fn truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "yes" | "true" | "1")
}

fn split_list(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Creator elements hold comma-separated name lists. A name appearing under
/// more than one element keeps only the last role seen.
fn push_credits(authors: &mut Vec<Author>, value: &str, role: Role) {
    for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if let Some(existing) = authors.iter_mut().find(|a| a.name == name) {
            existing.role = Some(role);
        } else {
            authors.push(Author::new(name, Some(role)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use time::OffsetDateTime;

    fn blank() -> ComicMetadata {
        ComicMetadata::new(PathBuf::from("/tmp/a.cbz"), 1, OffsetDateTime::UNIX_EPOCH)
    }

    #[test]
    fn full_document_overrides_seed() {
        let mut meta = blank();
        meta.title = "from filename".into();
        meta.series = Some("Wrong Series".into());
        let xml = br#"<?xml version="1.0"?>
<ComicInfo>
  <Title>The Anatomy Lesson</Title>
  <Series>Swamp Thing</Series>
  <Number>21</Number>
  <Volume>2</Volume>
  <Year>1984</Year>
  <Publisher>DC</Publisher>
  <Writer>Alan Moore</Writer>
  <Penciller>Stephen Bissette</Penciller>
  <Characters>Swamp Thing, Jason Woodrue</Characters>
  <BlackAndWhite>No</BlackAndWhite>
  <Manga>Yes</Manga>
  <PageCount>23</PageCount>
</ComicInfo>"#;
        apply(xml, &mut meta).unwrap();
        assert_eq!(meta.title, "The Anatomy Lesson");
        assert_eq!(meta.series.as_deref(), Some("Swamp Thing"));
        assert_eq!(meta.issue_number.as_deref(), Some("21"));
        assert_eq!(meta.volume, Some(2));
        assert_eq!(meta.year, Some(1984));
        assert_eq!(meta.publisher.as_deref(), Some("DC"));
        assert_eq!(meta.page_count, Some(23));
        assert!(!meta.black_and_white);
        assert!(meta.manga);
        assert_eq!(meta.characters.len(), 2);
        let rendered: Vec<String> = meta.authors.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["Alan Moore (writer)", "Stephen Bissette (penciller)"]
        );
    }

    #[test]
    fn minimal_document_applies_year_and_writer() {
        let mut meta = blank();
        let xml = b"<ComicInfo><Year>2012</Year><Writer>Jane Doe</Writer></ComicInfo>";
        apply(xml, &mut meta).unwrap();
        assert_eq!(meta.year, Some(2012));
        assert_eq!(meta.authors.len(), 1);
        assert_eq!(meta.authors[0].to_string(), "Jane Doe (writer)");
    }

    #[test]
    fn later_role_wins_for_duplicate_name() {
        let mut meta = blank();
        let xml = b"<ComicInfo><Writer>Frank Miller</Writer><Penciller>Frank Miller</Penciller></ComicInfo>";
        apply(xml, &mut meta).unwrap();
        assert_eq!(meta.authors.len(), 1);
        assert_eq!(meta.authors[0].to_string(), "Frank Miller (penciller)");
    }

    #[test]
    fn bad_numbers_are_dropped_not_fatal() {
        let mut meta = blank();
        let xml = b"<ComicInfo><Year>nineteen</Year><PageCount>-3</PageCount><Volume>2</Volume></ComicInfo>";
        apply(xml, &mut meta).unwrap();
        assert_eq!(meta.year, None);
        assert_eq!(meta.page_count, None);
        assert_eq!(meta.volume, Some(2));
    }

    #[test]
    fn implausible_year_is_discarded() {
        let mut meta = blank();
        apply(b"<ComicInfo><Year>1742</Year></ComicInfo>", &mut meta).unwrap();
        assert_eq!(meta.year, None);
    }

    #[test]
    fn empty_elements_leave_seed_intact() {
        let mut meta = blank();
        meta.title = "seeded".into();
        apply(b"<ComicInfo><Title></Title></ComicInfo>", &mut meta).unwrap();
        assert_eq!(meta.title, "seeded");
    }

    #[test]
    fn unclosed_document_is_malformed() {
        let mut meta = blank();
        let err = apply(b"<ComicInfo><Title>Oops", &mut meta).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MalformedSidecar));
    }

    #[test]
    fn unknown_elements_are_ignored() {
        let mut meta = blank();
        apply(
            b"<ComicInfo><Imprint>Vertigo</Imprint><Title>x</Title></ComicInfo>",
            &mut meta,
        )
        .unwrap();
        assert_eq!(meta.title, "x");
    }

    #[test]
    fn unknown_container_does_not_swallow_siblings() {
        let mut meta = blank();
        let xml = b"<ComicInfo><Pages><Page Image=\"0\"/></Pages><Title>x</Title></ComicInfo>";
        apply(xml, &mut meta).unwrap();
        assert_eq!(meta.title, "x");
    }
}
