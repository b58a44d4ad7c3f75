//! The `longbox` command-line interface.
//!
//! Three commands over one catalog: `scan` walks a directory of comics and
//! extracts metadata into the catalog database, `list` prints (optionally
//! filtered) catalog contents, `stats` prints collection totals.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use derive_more::{Display, Error};
use futures::{StreamExt, pin_mut};
use tracing::error;
use tracing_subscriber::EnvFilter;

use longbox_archive::Tools;
use longbox_catalog::{Database, Repository};
use longbox_config::Settings;
use longbox_library::scan::{ScanEvent, ScanOptions, ScanSession, SessionState};

#[derive(Parser)]
#[command(name = "longbox", version, about = "Catalog comic book archives")]
struct Cli {
    /// Path to an alternative config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the catalog database location.
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a directory of comics into the catalog.
    Scan {
        /// Directory to scan.
        dir: PathBuf,
        /// Do not descend into subdirectories.
        #[arg(long)]
        no_recursive: bool,
    },
    /// List cataloged comics, optionally filtered by a search term.
    List {
        /// Substring matched against title, series, and publisher.
        term: Option<String>,
    },
    /// Show collection statistics.
    Stats,
}

/// Flattened failure for top-level reporting. The structured error trees
/// stay inside the crates; by the time a failure reaches the user it is a
/// message and a non-zero exit code.
#[derive(Debug, Display, Error)]
#[display("{_0}")]
struct CliError(#[error(not(source))] String);

impl CliError {
    fn from_display(error: impl std::fmt::Display) -> Self {
        Self(error.to_string())
    }
}

type CliResult<T> = Result<T, CliError>;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let settings = match &cli.config {
        Some(file) => Settings::load_from(file),
        None => Settings::load(),
    }
    .map_err(CliError::from_display)?;

    let db_path = match cli.database {
        Some(path) => path,
        None => settings.database_path().map_err(CliError::from_display)?,
    };
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(CliError::from_display)?;
    }
    let db = Database::connect(&db_path)
        .await
        .map_err(CliError::from_display)?;
    let repo = Repository::from(&db);

    let outcome = match cli.command {
        Command::Scan { dir, no_recursive } => scan(&settings, repo, dir, no_recursive).await,
        Command::List { term } => list(repo, term.as_deref()).await,
        Command::Stats => stats(repo).await,
    };
    db.close().await;
    outcome
}

async fn scan(
    settings: &Settings,
    repo: Repository,
    dir: PathBuf,
    no_recursive: bool,
) -> CliResult<()> {
    let tools = Tools::resolve(settings.tools.pdftoppm.as_deref());
    let options = ScanOptions {
        root: dir,
        recursive: settings.library.recursive && !no_recursive,
        tools,
    };
    let (session, stop) = ScanSession::new(options, repo);

    // Ctrl-C trips the stop flag: the in-flight file completes and every
    // already-committed record stays in the catalog.
    tokio::spawn({
        let stop = stop.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("stopping after the current file...");
                stop.stop();
            }
        }
    });

    let stream = session.run();
    pin_mut!(stream);
    while let Some(event) = stream.next().await {
        match event.map_err(CliError::from_display)? {
            ScanEvent::Started => {}
            ScanEvent::DiscoveryComplete(total) => println!("found {total} comic files"),
            ScanEvent::Extracted {
                index,
                total,
                metadata,
            } => {
                let issue = metadata
                    .issue_number
                    .as_deref()
                    .map(|n| format!(" #{n}"))
                    .unwrap_or_default();
                println!("[{index}/{total}] {}{issue}", metadata.title);
            }
            ScanEvent::Skipped {
                index,
                total,
                path,
                reason,
            } => {
                println!("[{index}/{total}] skipped {}: {reason}", path.display());
            }
            ScanEvent::Finished(summary) => {
                let state = match summary.state {
                    SessionState::Completed => "complete",
                    SessionState::Stopped => "stopped",
                    SessionState::Failed => "failed",
                    SessionState::Idle | SessionState::Running => "interrupted",
                };
                println!(
                    "scan {state}: {} cataloged, {} skipped, {} found",
                    summary.extracted, summary.skipped, summary.total
                );
            }
        }
    }
    Ok(())
}

async fn list(repo: Repository, term: Option<&str>) -> CliResult<()> {
    let comics = match term {
        Some(term) => repo.search(term).await,
        None => repo.list_comics().await,
    }
    .map_err(CliError::from_display)?;

    if comics.is_empty() {
        println!("no comics cataloged");
        return Ok(());
    }
    for comic in comics {
        let series = comic.series.as_deref().unwrap_or("(no series)");
        let issue = comic
            .issue_number
            .as_deref()
            .map(|n| format!(" #{n}"))
            .unwrap_or_default();
        let year = comic
            .year
            .map(|y| format!(" ({y})"))
            .unwrap_or_default();
        println!("{series}{issue}{year}  {}  [{}]", comic.title, comic.file_path);
    }
    Ok(())
}

async fn stats(repo: Repository) -> CliResult<()> {
    let stats = repo.stats().await.map_err(CliError::from_display)?;
    println!("comics:     {}", stats.comics);
    println!("series:     {}", stats.series);
    println!("publishers: {}", stats.publishers);
    println!("authors:    {}", stats.authors);
    println!("total size: {}", format_size(stats.total_bytes));
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn scan_flags_parse() {
        let cli = Cli::parse_from(["longbox", "scan", "/comics", "--no-recursive"]);
        match cli.command {
            Command::Scan { dir, no_recursive } => {
                assert_eq!(dir, PathBuf::from("/comics"));
                assert!(no_recursive);
            }
            _ => panic!("expected scan command"),
        }
    }

    #[test]
    fn format_size_picks_sensible_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }
}
