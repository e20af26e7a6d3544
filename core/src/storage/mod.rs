//! User-configurable storage root and the fixed directories resolved beneath it.
//!
//! The base directory can change at runtime (the user picks a new location); every change
//! re-resolves the layout, creates the directories, and is broadcast to subscribers so holders
//! of a stale path can follow.

use std::fs::{self, OpenOptions};
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::Result;

pub const AUTOMATIC_BACKUPS_DIR: &str = "autobackup";
pub const DOWNLOADS_DIR: &str = "downloads";
pub const LOCAL_SOURCE_DIR: &str = "local";
const NOMEDIA_FILE: &str = ".nomedia";

/// Directories derived from one base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub base: PathBuf,
    pub automatic_backups: PathBuf,
    pub downloads: PathBuf,
    pub local_source: PathBuf,
}

impl StorageLayout {
    pub fn resolve(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            automatic_backups: base.join(AUTOMATIC_BACKUPS_DIR),
            downloads: base.join(DOWNLOADS_DIR),
            local_source: base.join(LOCAL_SOURCE_DIR),
            base,
        }
    }

    fn prepare(&self) -> Result<()> {
        for dir in [&self.base, &self.automatic_backups, &self.downloads, &self.local_source] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating storage directory {}", dir.display()))?;
        }

        // Keeps gallery apps from indexing downloaded pages.
        let nomedia = self.base.join(NOMEDIA_FILE);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&nomedia)
            .with_context(|| format!("creating {}", nomedia.display()))?;
        Ok(())
    }
}

/// Owns the current [`StorageLayout`] and broadcasts replacements.
#[derive(Debug)]
pub struct StorageManager {
    layout: watch::Sender<StorageLayout>,
}

impl StorageManager {
    /// Resolve and create the layout under `base`.
    pub fn new(base: impl Into<PathBuf>) -> Result<Self> {
        let layout = StorageLayout::resolve(base);
        layout.prepare()?;
        debug!(base = %layout.base.display(), "storage layout ready");
        let (layout, _) = watch::channel(layout);
        Ok(Self { layout })
    }

    /// Point storage at a new base directory.
    ///
    /// Returns `false` without broadcasting when the base is unchanged. On failure the
    /// previous layout stays current.
    pub fn set_base_dir(&self, base: impl Into<PathBuf>) -> Result<bool> {
        let layout = StorageLayout::resolve(base);
        if *self.layout.borrow() == layout {
            return Ok(false);
        }
        layout.prepare()?;
        info!(base = %layout.base.display(), "storage base directory changed");
        self.layout.send_replace(layout);
        Ok(true)
    }

    pub fn layout(&self) -> StorageLayout {
        self.layout.borrow().clone()
    }

    /// Stream of layouts; the receiver starts at the current one.
    pub fn subscribe(&self) -> watch::Receiver<StorageLayout> {
        self.layout.subscribe()
    }

    pub fn base_dir(&self) -> PathBuf {
        self.layout.borrow().base.clone()
    }

    pub fn automatic_backups_dir(&self) -> PathBuf {
        self.layout.borrow().automatic_backups.clone()
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.layout.borrow().downloads.clone()
    }

    pub fn local_source_dir(&self) -> PathBuf {
        self.layout.borrow().local_source.clone()
    }

    /// Whether `path` currently lives inside the storage base.
    pub fn contains(&self, path: &Path) -> bool {
        path.strip_prefix(&self.layout.borrow().base)
            .is_ok_and(|rest| rest.components().all(|part| matches!(part, Component::Normal(_))))
    }
}
