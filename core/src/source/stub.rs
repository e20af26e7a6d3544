//! Placeholder for sources whose extension is not installed.

use std::fmt;

use crate::types::{Chapter, Manga, MangasPage, Page, SourceInfo};

use super::catalogue::CatalogueBackend;
use super::error::{SourceError, SourceResult};

/// Stands in for a source id nobody currently provides; every data operation fails with
/// [`SourceError::NotInstalled`].
#[derive(Debug)]
pub struct StubSource {
    info: SourceInfo,
}

impl StubSource {
    pub fn new(info: SourceInfo) -> Self {
        Self { info }
    }

    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    pub fn not_installed(&self) -> SourceError {
        SourceError::NotInstalled {
            id: self.info.id,
            name: self.info.has_name().then(|| self.info.name.clone()),
        }
    }
}

impl CatalogueBackend for StubSource {
    fn popular_manga(&self, _page: u32) -> SourceResult<MangasPage> {
        Err(self.not_installed())
    }

    fn latest_updates(&self, _page: u32) -> SourceResult<MangasPage> {
        Err(self.not_installed())
    }

    fn search_manga(&self, _page: u32, _query: &str) -> SourceResult<MangasPage> {
        Err(self.not_installed())
    }

    fn manga_details(&self, _manga: &Manga) -> SourceResult<Manga> {
        Err(self.not_installed())
    }

    fn chapter_list(&self, _manga: &Manga) -> SourceResult<Vec<Chapter>> {
        Err(self.not_installed())
    }

    fn page_list(&self, _chapter: &Chapter) -> SourceResult<Vec<Page>> {
        Err(self.not_installed())
    }
}

impl fmt::Display for StubSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.info, f)
    }
}
