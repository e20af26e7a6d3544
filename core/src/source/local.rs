//! Manga stored as plain folders under the storage `local` directory.
//!
//! Layout understood by the source:
//!
//! ```text
//! local/
//!   <manga title>/
//!     cover.jpg          optional, any supported image named `cover`
//!     details.json       optional metadata
//!     Chapter 1/         a folder of page images
//!     Chapter 2.cbz      or an archive of page images
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::fs::{self as local_fs, DirEntry};
use crate::storage::StorageManager;
use crate::types::{Chapter, LOCAL_SOURCE_ID, Manga, MangaStatus, MangasPage, Page, SourceInfo};

use super::catalogue::CatalogueBackend;
use super::error::{SourceError, SourceResult};

pub const LOCAL_SOURCE_NAME: &str = "Local source";
pub const LOCAL_SOURCE_LANG: &str = "other";

const DETAILS_FILE: &str = "details.json";
const COVER_STEM: &str = "cover";
/// Separates the archive path from the entry name in archive page URLs.
const ARCHIVE_ENTRY_SEPARATOR: &str = "::";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetailsFile {
    title: Option<String>,
    author: Option<String>,
    artist: Option<String>,
    description: Option<String>,
    genre: Vec<String>,
    status: Option<i64>,
}

#[derive(Debug)]
pub struct LocalSource {
    info: SourceInfo,
    storage: Arc<StorageManager>,
}

impl LocalSource {
    pub fn new(storage: Arc<StorageManager>) -> Self {
        let info = SourceInfo::new(LOCAL_SOURCE_ID, LOCAL_SOURCE_NAME, LOCAL_SOURCE_LANG);
        Self { info, storage }
    }

    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    /// Current root; follows storage base directory changes.
    pub fn root(&self) -> PathBuf {
        self.storage.local_source_dir()
    }

    fn not_found(&self, key: &str) -> SourceError {
        SourceError::NotFound { id: self.info.id, key: key.to_string() }
    }

    /// Resolve a source-relative key without letting it escape the root.
    fn resolve(&self, key: &str) -> SourceResult<PathBuf> {
        let relative =
            local_fs::sanitize_relative_path(Path::new(key)).ok_or_else(|| self.not_found(key))?;
        let path = self.root().join(relative);
        if path.exists() { Ok(path) } else { Err(self.not_found(key)) }
    }

    /// Accept an absolute page path only if it stays under the root once `..` is accounted for.
    fn contained(&self, path: &str) -> SourceResult<PathBuf> {
        let root = self.root();
        Path::new(path)
            .strip_prefix(&root)
            .ok()
            .and_then(local_fs::sanitize_relative_path)
            .map(|relative| root.join(relative))
            .ok_or_else(|| self.not_found(path))
    }

    fn manga_entries(&self) -> SourceResult<Vec<DirEntry>> {
        let entries = local_fs::list_entries(&self.root())?;
        Ok(entries.into_iter().filter(|entry| entry.is_dir).collect())
    }

    fn summary(entry: &DirEntry) -> Manga {
        let mut manga = Manga::new(entry.name.clone(), entry.name.clone());
        manga.thumbnail_url =
            find_cover(&entry.path).map(|path| path.to_string_lossy().into_owned());
        manga
    }

    /// Cover image inside a manga folder, if any.
    pub fn cover_path(&self, manga: &Manga) -> Option<PathBuf> {
        self.resolve(&manga.url).ok().and_then(|dir| find_cover(&dir))
    }

    /// Encoded bytes of a page returned by [`CatalogueBackend::page_list`].
    pub fn read_page(&self, page: &Page) -> SourceResult<Vec<u8>> {
        if let Some(image) = &page.image_url {
            let path = self.contained(image)?;
            return fs::read(&path).map_err(|err| SourceError::Backend(err.into()));
        }

        let (archive, entry) = page
            .url
            .rsplit_once(ARCHIVE_ENTRY_SEPARATOR)
            .ok_or_else(|| self.not_found(&page.url))?;
        let archive = self.contained(archive).map_err(|_| self.not_found(&page.url))?;
        Ok(local_fs::read_archive_entry(&archive, Path::new(entry))?)
    }
}

fn find_cover(manga_dir: &Path) -> Option<PathBuf> {
    local_fs::list_entries(manga_dir)
        .ok()?
        .into_iter()
        .filter(|entry| !entry.is_dir && local_fs::is_supported_image(&entry.path))
        .find(|entry| {
            entry
                .path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.eq_ignore_ascii_case(COVER_STEM))
        })
        .map(|entry| entry.path)
}

fn read_details(dir: &Path) -> Option<DetailsFile> {
    let path = dir.join(DETAILS_FILE);
    let bytes = fs::read(&path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(details) => Some(details),
        Err(err) => {
            warn!(path = %path.display(), "ignoring unreadable local details: {err}");
            None
        }
    }
}

impl CatalogueBackend for LocalSource {
    fn popular_manga(&self, _page: u32) -> SourceResult<MangasPage> {
        let mangas = self.manga_entries()?.iter().map(Self::summary).collect();
        Ok(MangasPage::last(mangas))
    }

    fn supports_latest(&self) -> bool {
        true
    }

    fn latest_updates(&self, _page: u32) -> SourceResult<MangasPage> {
        let mut entries = self.manga_entries()?;
        entries.sort_by(|a, b| b.modified_ms.cmp(&a.modified_ms));
        Ok(MangasPage::last(entries.iter().map(Self::summary).collect()))
    }

    fn search_manga(&self, _page: u32, query: &str) -> SourceResult<MangasPage> {
        let needle = query.trim().to_lowercase();
        let mangas = self
            .manga_entries()?
            .iter()
            .filter(|entry| entry.name.to_lowercase().contains(&needle))
            .map(Self::summary)
            .collect();
        Ok(MangasPage::last(mangas))
    }

    fn manga_details(&self, manga: &Manga) -> SourceResult<Manga> {
        let dir = self.resolve(&manga.url)?;
        let mut details = manga.clone();
        if details.title.is_empty() {
            details.title = manga.url.clone();
        }
        details.thumbnail_url = find_cover(&dir).map(|path| path.to_string_lossy().into_owned());

        if let Some(file) = read_details(&dir) {
            details.title = file.title.unwrap_or(details.title);
            details.author = file.author.or(details.author);
            details.artist = file.artist.or(details.artist);
            details.description = file.description.or(details.description);
            if !file.genre.is_empty() {
                details.genres = file.genre;
            }
            if let Some(code) = file.status {
                details.status = MangaStatus::from_code(code);
            }
        }

        details.initialized = true;
        Ok(details)
    }

    fn chapter_list(&self, manga: &Manga) -> SourceResult<Vec<Chapter>> {
        let dir = self.resolve(&manga.url)?;
        let mut chapters: Vec<Chapter> = local_fs::list_entries(&dir)?
            .into_iter()
            .filter(|entry| {
                if entry.is_dir {
                    local_fs::contains_images(&entry.path)
                } else {
                    local_fs::is_archive(&entry.path)
                }
            })
            .map(|entry| {
                let name = if entry.is_dir {
                    entry.name.clone()
                } else {
                    entry
                        .path
                        .file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                        .unwrap_or_default()
                };
                Chapter {
                    url: format!("{}/{}", manga.url, entry.name),
                    chapter_number: local_fs::chapter_number(&entry.name),
                    date_upload: entry.modified_ms,
                    name,
                }
            })
            .collect();

        // Listing is in natural order; readers expect the newest chapter first.
        chapters.reverse();
        Ok(chapters)
    }

    fn page_list(&self, chapter: &Chapter) -> SourceResult<Vec<Page>> {
        let path = self.resolve(&chapter.url)?;

        if path.is_dir() {
            let pages = local_fs::list_images(&path)?
                .into_iter()
                .enumerate()
                .map(|(index, relative)| {
                    let file = path.join(relative).to_string_lossy().into_owned();
                    Page { index: index as u32, url: file.clone(), image_url: Some(file) }
                })
                .collect();
            return Ok(pages);
        }

        if local_fs::is_archive(&path) {
            let archive = path.to_string_lossy().into_owned();
            let pages = local_fs::list_archive_images(&path)?
                .into_iter()
                .enumerate()
                .map(|(index, entry)| Page {
                    index: index as u32,
                    url: format!(
                        "{archive}{ARCHIVE_ENTRY_SEPARATOR}{}",
                        entry.path.to_string_lossy().replace('\\', "/")
                    ),
                    image_url: None,
                })
                .collect();
            return Ok(pages);
        }

        Err(self.not_found(&chapter.url))
    }
}
