//! Database connection and pool management.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// One writer (the scan session) plus an ad-hoc reader; the binary runs a
// single command at a time, so there is nothing for more connections to do.
const MAX_CONNECTIONS: u32 = 2;

/// Connection pool for the catalog database.
///
/// The catalog is rebuildable: the comic files themselves are the source of
/// truth, and a deleted database comes back from a rescan. Losing it costs
/// time, not data.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max: Option<u32>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Query-based PRAGMAs must be applied to every pooled
            // connection, not just the first one handed out.
            .after_connect(|conn, meta| {
                Box::pin(async move { Self::apply_pragmas(conn, meta).await })
            })
            .max_connections(max.unwrap_or(MAX_CONNECTIONS))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Connect to the catalog database at the given path.
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = Self::connect_options().filename(path).create_if_missing(true);
        Self::new(options, None).await
    }

    /// Connect to an in-memory database (useful for testing).
    ///
    /// Note:
    /// - In-memory databases are destroyed when the connection closes.
    /// - Not gated behind `#[cfg(test)]` so other crates can use it in
    ///   their tests too.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::connect_options().filename(":memory:");
        // In-memory databases must either share a cache or be limited to a
        // single connection; otherwise each pooled connection sees its own
        // empty database.
        Self::new(options, Some(1)).await
    }

    /// Connection options shared between file and in-memory databases.
    fn connect_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // WAL keeps `list` and `stats` readable while a scan is writing
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            // comic_authors references comics and authors with cascades
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            // A scan of thousands of files with one writer in WAL mode can
            // hit SQLITE_BUSY on too small a timeout.
            .busy_timeout(std::time::Duration::from_millis(1500))
    }

    /// Apply PRAGMA settings that aren't exposed via SqliteConnectOptions.
    ///
    /// Cover thumbnails put tens of kilobytes in every comics row, so the
    /// write side dominates: checkpoint the WAL often enough that a long
    /// scan doesn't let it balloon, and rely on mmap rather than a large
    /// page cache for the read side.
    async fn apply_pragmas(
        conn: &mut SqliteConnection,
        _meta: PoolConnectionMetadata,
    ) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA wal_autocheckpoint = 400;
                PRAGMA cache_size = -4096;
                PRAGMA temp_store = MEMORY;
                PRAGMA mmap_size = 67108864;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument("performing database migrations")]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .or_raise(|| ErrorKind::Migration)
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    ///
    /// Waits for all connections to be returned, then closes them.
    pub async fn close(&self) {
        // Let SQLite update query planner statistics
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_in_memory() {
        let db = Database::connect_in_memory().await.unwrap();
        assert!(!db.pool().is_closed());
        db.close().await;
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::connect_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn test_foreign_keys_are_enforced() {
        let db = Database::connect_in_memory().await.unwrap();
        let row: (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(row.0, 1, "foreign_keys should be ON");
        db.close().await;
    }

    #[tokio::test]
    async fn test_wal_checkpoint_interval_is_applied() {
        let db = Database::connect_in_memory().await.unwrap();
        let row: (i64,) = sqlx::query_as("PRAGMA wal_autocheckpoint")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(row.0, 400, "after_connect must run on pooled connections");
        db.close().await;
    }
}
