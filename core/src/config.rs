//! Core configuration and the platform directories it falls back to.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::Result;

const APP_QUALIFIER: &str = "com";
const APP_ORGANISATION: &str = "MangaShelf";
const APP_NAME: &str = "manga-shelf";

/// Optional overrides for where the core keeps its files.
///
/// Every field falls back to a directory under the platform data or cache dir.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// User-visible base directory holding downloads, backups, and local manga.
    pub storage_dir: Option<PathBuf>,
    /// Cache directory for downloaded thumbnails and custom covers.
    pub cover_cache_dir: Option<PathBuf>,
    /// JSON file backing the preference store.
    pub preferences_path: Option<PathBuf>,
    /// Directory for rolling log files.
    pub log_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Read a JSON config file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("parsing config at {}", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err).with_context(|| format!("reading config at {}", path.display())),
        }
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(|| data_dir().join("storage"))
    }

    pub fn cover_cache_dir(&self) -> PathBuf {
        self.cover_cache_dir.clone().unwrap_or_else(cache_dir)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.preferences_path
            .clone()
            .unwrap_or_else(|| data_dir().join("state").join("preferences.json"))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| data_dir().join("logs"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANISATION, APP_NAME)
}

/// Platform data directory, or a temp-dir fallback when no home directory is known.
pub fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("manga-shelf"))
}

/// Platform cache directory, or a temp-dir fallback.
pub fn cache_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("manga-shelf-cache"))
}
