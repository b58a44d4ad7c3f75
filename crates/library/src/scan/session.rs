//! The scan session: discovery, per-file extraction, catalog commit.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_stream::stream;
use exn::ResultExt;
use futures::Stream;
use tracing::{info, warn};

use longbox_archive::Tools;
use longbox_catalog::Repository;
use longbox_extract::{ComicMetadata, extract};

use super::discover::discover;
use crate::error::{ErrorKind, Result};

/// What a session was asked to do.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub root: PathBuf,
    pub recursive: bool,
    pub tools: Tools,
}

/// Lifecycle of a session. A summary always carries one of the three
/// terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    Stopped,
    Failed,
}

/// Cooperative cancellation for a running session.
///
/// Stopping is polled between files: the in-flight extraction finishes, its
/// record stands, and nothing already committed is rolled back.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Progress events yielded by [`ScanSession::run`].
pub enum ScanEvent {
    Started,
    /// Discovery finished; every later event carries indexes against this
    /// total.
    DiscoveryComplete(u64),
    Extracted {
        index: u64,
        total: u64,
        metadata: Box<ComicMetadata>,
    },
    Skipped {
        index: u64,
        total: u64,
        path: PathBuf,
        reason: String,
    },
    /// Always the final event, whatever happened before it.
    Finished(ScanSummary),
}

/// Closing tally for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub state: SessionState,
    pub extracted: u64,
    pub skipped: u64,
    pub total: u64,
}

/// A single pass over one library directory.
///
/// Sessions are one-shot: construct, run, read the summary. Files are
/// processed strictly in discovery order, one at a time, each on a blocking
/// worker so the extraction's archive I/O never stalls the runtime.
pub struct ScanSession {
    options: ScanOptions,
    repo: Repository,
    stop: Arc<AtomicBool>,
}

impl ScanSession {
    pub fn new(options: ScanOptions, repo: Repository) -> (Self, StopHandle) {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = StopHandle { flag: stop.clone() };
        let session = Self {
            options,
            repo,
            stop,
        };
        (session, handle)
    }

    /// Run the session to completion (or until stopped).
    ///
    /// A failed discovery yields one `Err` item followed by a `Finished`
    /// summary in the `Failed` state. Per-file failures only ever produce
    /// `Skipped` events.
    pub fn run(self) -> impl Stream<Item = Result<ScanEvent>> {
        stream! {
            yield Ok(ScanEvent::Started);

            let files = match self.discover_step().await {
                Ok(files) => files,
                Err(error) => {
                    yield Err(error);
                    yield Ok(ScanEvent::Finished(ScanSummary {
                        state: SessionState::Failed,
                        extracted: 0,
                        skipped: 0,
                        total: 0,
                    }));
                    return;
                }
            };
            let total = files.len() as u64;
            yield Ok(ScanEvent::DiscoveryComplete(total));

            let mut extracted: u64 = 0;
            let mut skipped: u64 = 0;
            let mut state = SessionState::Completed;
            for (position, path) in files.into_iter().enumerate() {
                if self.stop.load(Ordering::Relaxed) {
                    info!(processed = position, total, "session stopped");
                    state = SessionState::Stopped;
                    break;
                }
                let index = position as u64 + 1;
                match self.extract_step(path.clone()).await {
                    Ok(metadata) => {
                        extracted += 1;
                        yield Ok(ScanEvent::Extracted {
                            index,
                            total,
                            metadata: Box::new(metadata),
                        });
                    }
                    Err(reason) => {
                        skipped += 1;
                        warn!(path = %path.display(), reason, "skipping file");
                        yield Ok(ScanEvent::Skipped { index, total, path, reason });
                    }
                }
            }

            yield Ok(ScanEvent::Finished(ScanSummary {
                state,
                extracted,
                skipped,
                total,
            }));
        }
    }

    async fn discover_step(&self) -> Result<Vec<PathBuf>> {
        let root = self.options.root.clone();
        let recursive = self.options.recursive;
        let outcome = tokio::task::spawn_blocking(move || discover(&root, recursive))
            .await
            .or_raise(|| ErrorKind::Discovery(self.options.root.clone()))?;
        outcome
    }

    /// Extract one file and commit its record. Any failure comes back as a
    /// human-readable skip reason rather than an error type, since nothing
    /// about a single file can end the session.
    async fn extract_step(&self, path: PathBuf) -> std::result::Result<ComicMetadata, String> {
        let tools = self.options.tools.clone();
        let task_path = path.clone();
        let outcome = tokio::task::spawn_blocking(move || extract(&task_path, &tools)).await;
        let metadata = match outcome {
            Ok(Ok(metadata)) => metadata,
            Ok(Err(error)) => return Err(error.to_string()),
            Err(error) => return Err(format!("extraction panicked: {error}")),
        };
        self.commit(&metadata).await.map_err(|e| e.to_string())?;
        Ok(metadata)
    }

    async fn commit(&self, metadata: &ComicMetadata) -> Result<()> {
        self.repo
            .upsert_comic(metadata)
            .await
            .or_raise(|| ErrorKind::Catalog)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, pin_mut};
    use longbox_catalog::Database;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn write_cbz(path: &Path) {
        let img = image::DynamicImage::new_rgb8(4, 4);
        let mut png = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let file = fs::File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        writer.start_file("page01.png", options).unwrap();
        writer.write_all(&png).unwrap();
        writer.finish().unwrap();
    }

    async fn session_for(root: &Path) -> (Database, ScanSession, StopHandle) {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = Repository::from(&db);
        let options = ScanOptions {
            root: root.to_path_buf(),
            recursive: true,
            tools: Tools::none(),
        };
        let (session, handle) = ScanSession::new(options, repo);
        (db, session, handle)
    }

    #[tokio::test]
    async fn test_full_session_counts_and_commits() {
        let dir = tempfile::tempdir().unwrap();
        write_cbz(&dir.path().join("a.cbz"));
        write_cbz(&dir.path().join("b.cbz"));
        fs::write(dir.path().join("empty.cbz"), b"").unwrap();

        let (db, session, _handle) = session_for(dir.path()).await;
        let repo = Repository::from(&db);
        let stream = session.run();
        pin_mut!(stream);

        let mut extracted = 0;
        let mut skipped = 0;
        let mut summary = None;
        while let Some(event) = stream.next().await {
            match event.unwrap() {
                ScanEvent::Extracted { total, .. } => {
                    extracted += 1;
                    assert_eq!(total, 3);
                }
                ScanEvent::Skipped { path, reason, .. } => {
                    skipped += 1;
                    assert!(path.ends_with("empty.cbz"));
                    assert!(!reason.is_empty());
                }
                ScanEvent::Finished(s) => summary = Some(s),
                _ => {}
            }
        }
        let summary = summary.expect("session must finish");
        assert_eq!(summary.state, SessionState::Completed);
        assert_eq!((summary.extracted, summary.skipped, summary.total), (2, 1, 3));
        assert_eq!((extracted, skipped), (2, 1));

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.comics, 2);
        db.close().await;
    }

    #[tokio::test]
    async fn test_stop_mid_batch_keeps_committed_records() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.cbz", "b.cbz", "c.cbz", "d.cbz"] {
            write_cbz(&dir.path().join(name));
        }

        let (db, session, handle) = session_for(dir.path()).await;
        let repo = Repository::from(&db);
        let stream = session.run();
        pin_mut!(stream);

        let mut summary = None;
        while let Some(event) = stream.next().await {
            match event.unwrap() {
                ScanEvent::Extracted { index, .. } => {
                    if index == 1 {
                        handle.stop();
                    }
                }
                ScanEvent::Finished(s) => summary = Some(s),
                _ => {}
            }
        }
        let summary = summary.unwrap();
        assert_eq!(summary.state, SessionState::Stopped);
        assert_eq!(summary.extracted, 1, "in-flight file completes, rest do not start");

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.comics, 1, "already-committed records stand");
        db.close().await;
    }

    #[tokio::test]
    async fn test_unreadable_root_fails_the_session() {
        let (db, session, _handle) = session_for(Path::new("/no/such/library")).await;
        let stream = session.run();
        pin_mut!(stream);

        let mut saw_error = false;
        let mut summary = None;
        while let Some(event) = stream.next().await {
            match event {
                Ok(ScanEvent::Finished(s)) => summary = Some(s),
                Ok(_) => {}
                Err(error) => {
                    saw_error = true;
                    assert!(matches!(&*error, ErrorKind::Discovery(_)));
                }
            }
        }
        assert!(saw_error);
        assert_eq!(summary.unwrap().state, SessionState::Failed);
        db.close().await;
    }

    #[tokio::test]
    async fn test_stop_handle_is_sticky() {
        let (db, _session, handle) = session_for(Path::new(".")).await;
        assert!(!handle.is_stopped());
        handle.stop();
        assert!(handle.is_stopped());
        handle.stop();
        assert!(handle.is_stopped());
        db.close().await;
    }
}
