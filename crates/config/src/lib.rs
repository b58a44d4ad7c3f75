//! Configuration loading and validation.
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! a TOML config file (`config.toml` in the platform config directory, or an
//! explicit path), and `LONGBOX_`-prefixed environment variables
//! (`LONGBOX_LIBRARY_RECURSIVE=false`, `LONGBOX_DATABASE_PATH=...`).

pub mod error;

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use crate::error::{Error, ErrorKind, Result};

const ENV_PREFIX: &str = "LONGBOX_";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "catalog.sqlite3";

/// Everything configurable about a longbox installation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub library: LibrarySettings,
    pub database: DatabaseSettings,
    pub tools: ToolSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Whether scans descend into subdirectories.
    pub recursive: bool,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self { recursive: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Catalog location. Defaults to the platform data directory when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Explicit rasterizer location; a `PATH` lookup is used when unset.
    pub pdftoppm: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the default config file location plus environment
    /// overrides. A missing config file is not an error; defaults apply.
    pub fn load() -> Result<Self> {
        let file = project_dirs()?.config_dir().join(CONFIG_FILE);
        Self::load_from(&file)
    }

    /// Load settings from an explicit config file path plus environment
    /// overrides.
    pub fn load_from(file: &Path) -> Result<Self> {
        let settings: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("_"))
            .extract()
            .or_raise(|| ErrorKind::Parse)?;
        debug!(file = %file.display(), "configuration loaded");
        Ok(settings)
    }

    /// The catalog database path: configured, or the platform default.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join(DATABASE_FILE)),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "longbox").ok_or_raise(|| ErrorKind::Paths)
}
