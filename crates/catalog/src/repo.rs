//! Repository for comic records and their normalized entities.
//!
//! Publishers, series, subseries, and authors are deduplicated by name and
//! shared between comics. A comic row is keyed by its absolute file path, so
//! re-cataloging the same file updates in place rather than duplicating.

use exn::{OptionExt, ResultExt};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use time::format_description::well_known::Rfc3339;

use longbox_extract::ComicMetadata;

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{
    CatalogStats, ComicRecord, ComicRow, ComicSummary, Credit, SummaryRow, join_list,
};

/// Repository for managing comics in the catalog database.
///
/// # Relationships
///
/// - Many comics share one publisher, series, or author row.
/// - A series optionally belongs to a publisher; a subseries always belongs
///   to a series.
/// - Deleting a comic cascades to its author links, never to the authors.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn path_to_text(path: impl AsRef<Path>) -> Result<String> {
        Ok(path
            .as_ref()
            .to_str()
            .ok_or_raise(|| ErrorKind::InvalidData("path"))?
            .to_string())
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Insert or update the record for one comic file.
    ///
    /// The whole operation (entity upserts, the comic row, and the credit
    /// links) commits atomically. Returns the comic's row id.
    pub async fn upsert_comic(&self, meta: &ComicMetadata) -> Result<i64> {
        let file_path = Self::path_to_text(&meta.file_path)?;
        let file_modified = meta
            .file_modified
            .format(&Rfc3339)
            .or_raise(|| ErrorKind::InvalidData("timestamp"))?;
        let file_size =
            i64::try_from(meta.file_size).or_raise(|| ErrorKind::InvalidData("file size"))?;

        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;

        let publisher_id = match &meta.publisher {
            Some(name) => Some(Self::upsert_publisher(&mut tx, name).await?),
            None => None,
        };
        let series_id = match &meta.series {
            Some(name) => Some(Self::upsert_series(&mut tx, name, publisher_id).await?),
            None => None,
        };
        let subseries_id = match (&meta.subseries, series_id) {
            (Some(name), Some(series_id)) => {
                Some(Self::upsert_subseries(&mut tx, name, series_id).await?)
            }
            _ => None,
        };

        let comic_id: i64 = sqlx::query_scalar(include_str!("../queries/upsert_comic.sql"))
            .bind(&meta.title)
            .bind(series_id)
            .bind(subseries_id)
            .bind(publisher_id)
            .bind(&meta.issue_number)
            .bind(meta.volume.map(i64::from))
            .bind(meta.year.map(i64::from))
            .bind(&meta.summary)
            .bind(&meta.notes)
            .bind(&meta.genre)
            .bind(&meta.language)
            .bind(&meta.web)
            .bind(meta.page_count.map(i64::from))
            .bind(&meta.format)
            .bind(i64::from(meta.black_and_white))
            .bind(i64::from(meta.manga))
            .bind(join_list(&meta.characters))
            .bind(join_list(&meta.teams))
            .bind(join_list(&meta.locations))
            .bind(&meta.scan_info)
            .bind(&meta.story_arc)
            .bind(&meta.story_arc_number)
            .bind(&meta.series_group)
            .bind(&meta.alternate_series)
            .bind(&meta.alternate_number)
            .bind(meta.alternate_count.map(i64::from))
            .bind(meta.count.map(i64::from))
            .bind(&meta.age_rating)
            .bind(meta.community_rating.map(f64::from))
            .bind(&meta.main_character_or_team)
            .bind(&meta.review)
            .bind(&file_path)
            .bind(file_size)
            .bind(&file_modified)
            .bind(meta.cover_image.as_deref())
            .bind(&meta.cover_image_type)
            .fetch_one(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;

        // Replace the credit links wholesale; stale roles must not linger
        // across a re-catalog.
        sqlx::query(include_str!("../queries/clear_credits.sql"))
            .bind(comic_id)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        for author in &meta.authors {
            let author_id: i64 = sqlx::query_scalar(include_str!("../queries/upsert_author.sql"))
                .bind(&author.name)
                .fetch_one(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
            sqlx::query(include_str!("../queries/link_author.sql"))
                .bind(comic_id)
                .bind(author_id)
                .bind(author.role.map(|r| r.as_str()))
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }

        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(comic_id)
    }

    async fn upsert_publisher(tx: &mut Transaction<'_, Sqlite>, name: &str) -> Result<i64> {
        sqlx::query_scalar(include_str!("../queries/upsert_publisher.sql"))
            .bind(name)
            .fetch_one(&mut **tx)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// SQLite treats NULLs as distinct in unique indexes, so a series with
    /// no publisher can't rely on ON CONFLICT; select first, insert if
    /// absent.
    async fn upsert_series(
        tx: &mut Transaction<'_, Sqlite>,
        name: &str,
        publisher_id: Option<i64>,
    ) -> Result<i64> {
        let existing: Option<i64> = sqlx::query_scalar(include_str!("../queries/get_series.sql"))
            .bind(name)
            .bind(publisher_id)
            .fetch_optional(&mut **tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if let Some(id) = existing {
            return Ok(id);
        }
        sqlx::query_scalar(include_str!("../queries/insert_series.sql"))
            .bind(name)
            .bind(publisher_id)
            .fetch_one(&mut **tx)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    async fn upsert_subseries(
        tx: &mut Transaction<'_, Sqlite>,
        name: &str,
        series_id: i64,
    ) -> Result<i64> {
        sqlx::query_scalar(include_str!("../queries/upsert_subseries.sql"))
            .bind(name)
            .bind(series_id)
            .fetch_one(&mut **tx)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    /// Get the full record for a comic by its absolute file path.
    pub async fn get_by_path(&self, path: impl AsRef<Path>) -> Result<Option<ComicRecord>> {
        let row: Option<ComicRow> = sqlx::query_as(include_str!("../queries/get_by_path.sql"))
            .bind(Self::path_to_text(path)?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut record = ComicRecord::try_from(row)?;
        record.authors = self.credits_for(record.id).await?;
        Ok(Some(record))
    }

    async fn credits_for(&self, comic_id: i64) -> Result<Vec<Credit>> {
        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as(include_str!("../queries/get_credits.sql"))
                .bind(comic_id)
                .fetch_all(&self.pool)
                .await
                .or_raise(|| ErrorKind::Database)?;
        Ok(rows
            .into_iter()
            .map(|(name, role)| Credit { name, role })
            .collect())
    }

    /// Get the stored cover bytes and MIME type for a comic, if any.
    pub async fn get_cover(&self, path: impl AsRef<Path>) -> Result<Option<(Vec<u8>, String)>> {
        let row: Option<(Option<Vec<u8>>, Option<String>)> =
            sqlx::query_as(include_str!("../queries/get_cover.sql"))
                .bind(Self::path_to_text(path)?)
                .fetch_optional(&self.pool)
                .await
                .or_raise(|| ErrorKind::Database)?;
        Ok(match row {
            Some((Some(bytes), Some(mime))) => Some((bytes, mime)),
            _ => None,
        })
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// List every comic in the catalog, grouped by series then issue.
    pub async fn list_comics(&self) -> Result<Vec<ComicSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(include_str!("../queries/list_comics.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Case-insensitive substring search over title, series, and publisher.
    pub async fn search(&self, term: &str) -> Result<Vec<ComicSummary>> {
        let pattern = format!("%{term}%");
        let rows: Vec<SummaryRow> = sqlx::query_as(include_str!("../queries/search_comics.sql"))
            .bind(pattern)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// List all cataloged file paths, for staleness comparison against a
    /// fresh directory walk.
    pub async fn list_all_paths(&self) -> Result<Vec<String>> {
        sqlx::query_scalar(include_str!("../queries/list_all_paths.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Remove the record for a file that no longer exists on disk.
    ///
    /// Returns `true` when a record was actually removed.
    pub async fn delete_by_path(&self, path: impl AsRef<Path>) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_by_path.sql"))
            .bind(Self::path_to_text(path)?)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Stats
    // =========================================================================

    /// Aggregate counts over the whole catalog.
    pub async fn stats(&self) -> Result<CatalogStats> {
        let (comics, series, publishers, authors, total_bytes): (i64, i64, i64, i64, i64) =
            sqlx::query_as(include_str!("../queries/stats.sql"))
                .fetch_one(&self.pool)
                .await
                .or_raise(|| ErrorKind::Database)?;
        Ok(CatalogStats {
            comics: comics.unsigned_abs(),
            series: series.unsigned_abs(),
            publishers: publishers.unsigned_abs(),
            authors: authors.unsigned_abs(),
            total_bytes: total_bytes.unsigned_abs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use longbox_extract::{Author, Role};
    use std::path::PathBuf;
    use time::OffsetDateTime;

    async fn repo() -> (Database, Repository) {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        (db, repo)
    }

    fn sample(path: &str) -> ComicMetadata {
        let mut meta = ComicMetadata::new(
            PathBuf::from(path),
            1024,
            OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        );
        meta.title = "The Anatomy Lesson".into();
        meta.series = Some("Swamp Thing".into());
        meta.issue_number = Some("21".into());
        meta.set_year(1984);
        meta.publisher = Some("DC".into());
        meta.push_author(Author::new("Alan Moore", Some(Role::Writer)));
        meta.push_author(Author::new("Stephen Bissette", Some(Role::Penciller)));
        meta.page_count = Some(23);
        meta.set_cover(vec![0xff, 0xd8, 0xff], "image/jpeg");
        meta
    }

    #[tokio::test]
    async fn test_round_trip_full_record() {
        let (db, repo) = repo().await;
        repo.upsert_comic(&sample("/library/st-021.cbz"))
            .await
            .unwrap();

        let record = repo
            .get_by_path("/library/st-021.cbz")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.title, "The Anatomy Lesson");
        assert_eq!(record.series.as_deref(), Some("Swamp Thing"));
        assert_eq!(record.issue_number.as_deref(), Some("21"));
        assert_eq!(record.year, Some(1984));
        assert_eq!(record.publisher.as_deref(), Some("DC"));
        assert_eq!(record.page_count, Some(23));
        assert_eq!(record.file_size, 1024);
        assert!(record.has_cover);
        assert_eq!(record.cover_image_type.as_deref(), Some("image/jpeg"));
        assert_eq!(record.authors.len(), 2);
        assert_eq!(record.authors[0].name, "Alan Moore");
        assert_eq!(record.authors[0].role.as_deref(), Some("writer"));

        let cover = repo
            .get_cover("/library/st-021.cbz")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cover.0, vec![0xff, 0xd8, 0xff]);
        db.close().await;
    }

    #[tokio::test]
    async fn test_upsert_is_keyed_by_path() {
        let (db, repo) = repo().await;
        let first = repo.upsert_comic(&sample("/library/a.cbz")).await.unwrap();

        let mut changed = sample("/library/a.cbz");
        changed.title = "Retitled".into();
        changed.authors = vec![Author::new("Alan Moore", Some(Role::Editor))];
        let second = repo.upsert_comic(&changed).await.unwrap();

        assert_eq!(first, second, "same path must update the same row");
        let record = repo.get_by_path("/library/a.cbz").await.unwrap().unwrap();
        assert_eq!(record.title, "Retitled");
        assert_eq!(record.authors.len(), 1, "credit links are replaced");
        assert_eq!(record.authors[0].role.as_deref(), Some("editor"));
        db.close().await;
    }

    #[tokio::test]
    async fn test_entities_are_shared_between_comics() {
        let (db, repo) = repo().await;
        repo.upsert_comic(&sample("/library/a.cbz")).await.unwrap();
        repo.upsert_comic(&sample("/library/b.cbz")).await.unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.comics, 2);
        assert_eq!(stats.series, 1);
        assert_eq!(stats.publishers, 1);
        assert_eq!(stats.authors, 2);
        assert_eq!(stats.total_bytes, 2048);
        db.close().await;
    }

    #[tokio::test]
    async fn test_series_without_publisher_is_not_duplicated() {
        let (db, repo) = repo().await;
        let mut meta = sample("/library/a.cbz");
        meta.publisher = None;
        repo.upsert_comic(&meta).await.unwrap();
        let mut meta = sample("/library/b.cbz");
        meta.publisher = None;
        repo.upsert_comic(&meta).await.unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.series, 1);
        assert_eq!(stats.publishers, 0);
        db.close().await;
    }

    #[tokio::test]
    async fn test_delete_by_path() {
        let (db, repo) = repo().await;
        repo.upsert_comic(&sample("/library/gone.cbz"))
            .await
            .unwrap();
        assert!(repo.delete_by_path("/library/gone.cbz").await.unwrap());
        assert!(!repo.delete_by_path("/library/gone.cbz").await.unwrap());
        assert!(
            repo.get_by_path("/library/gone.cbz")
                .await
                .unwrap()
                .is_none()
        );
        db.close().await;
    }

    #[tokio::test]
    async fn test_listing_and_paths() {
        let (db, repo) = repo().await;
        let mut a = sample("/library/a.cbz");
        a.issue_number = Some("1".into());
        let mut b = sample("/library/b.cbz");
        b.issue_number = Some("2".into());
        repo.upsert_comic(&b).await.unwrap();
        repo.upsert_comic(&a).await.unwrap();

        let list = repo.list_comics().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].issue_number.as_deref(), Some("1"));

        let paths = repo.list_all_paths().await.unwrap();
        assert_eq!(paths, vec!["/library/a.cbz", "/library/b.cbz"]);

        let hits = repo.search("swamp").await.unwrap();
        assert_eq!(hits.len(), 2, "series name matches case-insensitively");
        let hits = repo.search("nothing like this").await.unwrap();
        assert!(hits.is_empty());
        db.close().await;
    }

    #[tokio::test]
    async fn test_minimal_record_round_trips() {
        let (db, repo) = repo().await;
        let mut meta = ComicMetadata::new(
            PathBuf::from("/library/bare.cbz"),
            7,
            OffsetDateTime::UNIX_EPOCH,
        );
        meta.title = "bare".into();
        repo.upsert_comic(&meta).await.unwrap();

        let record = repo.get_by_path("/library/bare.cbz").await.unwrap().unwrap();
        assert_eq!(record.title, "bare");
        assert_eq!(record.series, None);
        assert!(record.authors.is_empty());
        assert!(!record.has_cover);
        db.close().await;
    }
}
