//! Cover files on disk: thumbnails downloaded from sources and user-set custom covers.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use tracing::debug;

use crate::fs::write_atomic;
use crate::types::MangaId;

use super::Result;
use super::disk::DiskCache;

const THUMBNAILS_DIR: &str = "covers";
const CUSTOM_COVERS_DIR: &str = "custom_covers";

/// Thumbnails are keyed by URL; custom covers by manga and take precedence.
#[derive(Debug)]
pub struct CoverCache {
    thumbnails: DiskCache,
    custom_dir: PathBuf,
}

impl CoverCache {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let thumbnails = DiskCache::new(root.join(THUMBNAILS_DIR))?;
        let custom_dir = root.join(CUSTOM_COVERS_DIR);
        fs::create_dir_all(&custom_dir)
            .with_context(|| format!("creating custom cover directory {}", custom_dir.display()))?;
        Ok(Self { thumbnails, custom_dir })
    }

    pub fn thumbnail_path(&self, url: &str) -> PathBuf {
        self.thumbnails.path_for(url)
    }

    pub fn write_thumbnail(&self, url: &str, bytes: &[u8]) -> Result<PathBuf> {
        self.thumbnails.write(url, bytes)
    }

    /// Drop a cached thumbnail, e.g. after the source changed its cover.
    pub fn remove_thumbnail(&self, url: &str) -> Result<bool> {
        self.thumbnails.remove(url)
    }

    pub fn custom_cover_path(&self, manga: MangaId) -> PathBuf {
        self.custom_dir.join(manga.to_string())
    }

    pub fn write_custom_cover(&self, manga: MangaId, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.custom_cover_path(manga);
        write_atomic(&path, bytes)?;
        debug!(%manga, "custom cover saved");
        Ok(path)
    }

    pub fn delete_custom_cover(&self, manga: MangaId) -> Result<bool> {
        match fs::remove_file(self.custom_cover_path(manga)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Encoded cover bytes: the custom cover if set, otherwise the cached thumbnail.
    pub fn cover_bytes(&self, manga: MangaId, thumbnail_url: Option<&str>) -> Result<Vec<u8>> {
        match fs::read(self.custom_cover_path(manga)) {
            Ok(bytes) => return Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| format!("reading custom cover of manga {manga}"));
            }
        }

        let url = thumbnail_url.ok_or_else(|| anyhow!("manga {manga} has no cover to read"))?;
        self.thumbnails
            .read(url)?
            .ok_or_else(|| anyhow!("thumbnail for manga {manga} is not cached"))
    }

    /// A provider for `CoverMetadataCache::compute_and_store` reading this manga's cover.
    pub fn provider(
        self: &Arc<Self>,
        manga: MangaId,
        thumbnail_url: Option<String>,
    ) -> impl FnOnce() -> Result<Vec<u8>> + Send + 'static {
        let cache = Arc::clone(self);
        move || cache.cover_bytes(manga, thumbnail_url.as_deref())
    }
}
