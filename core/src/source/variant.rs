//! The closed set of source kinds and their shared capability surface.

use std::fmt;
use std::sync::Arc;

use crate::types::{Chapter, Manga, MangasPage, Page, SourceId, SourceInfo};

use super::catalogue::{CatalogueBackend, CatalogueSource, HttpSource};
use super::error::{SourceError, SourceResult};
use super::local::LocalSource;
use super::stub::StubSource;

/// A registered source. Cloning shares the underlying implementation.
#[derive(Debug, Clone)]
pub enum Source {
    /// Manga stored under the local storage directory.
    Local(Arc<LocalSource>),
    /// Extension source without a website behind it.
    Catalogue(Arc<CatalogueSource>),
    /// Extension source backed by a website.
    Http(Arc<HttpSource>),
    /// Placeholder for an id with no installed implementation.
    Stub(Arc<StubSource>),
}

impl Source {
    pub fn catalogue(info: SourceInfo, backend: Arc<dyn CatalogueBackend>) -> Self {
        Self::Catalogue(Arc::new(CatalogueSource::new(info, backend)))
    }

    pub fn http(
        info: SourceInfo,
        base_url: impl Into<String>,
        backend: Arc<dyn CatalogueBackend>,
    ) -> Self {
        Self::Http(Arc::new(HttpSource::new(info, base_url, backend)))
    }

    pub fn info(&self) -> &SourceInfo {
        match self {
            Self::Local(source) => source.info(),
            Self::Catalogue(source) => source.info(),
            Self::Http(source) => source.info(),
            Self::Stub(source) => source.info(),
        }
    }

    pub fn id(&self) -> SourceId {
        self.info().id
    }

    pub fn name(&self) -> &str {
        &self.info().name
    }

    pub fn lang(&self) -> &str {
        &self.info().lang
    }

    pub fn is_stub(&self) -> bool {
        matches!(self, Self::Stub(_))
    }

    /// Whether the source can be browsed and searched.
    pub fn is_catalogue(&self) -> bool {
        !self.is_stub()
    }

    pub fn as_http(&self) -> Option<&Arc<HttpSource>> {
        match self {
            Self::Http(source) => Some(source),
            _ => None,
        }
    }

    pub fn as_stub(&self) -> Option<&Arc<StubSource>> {
        match self {
            Self::Stub(stub) => Some(stub),
            _ => None,
        }
    }

    /// Whether both handles point at the same implementation instance.
    pub fn ptr_eq(&self, other: &Source) -> bool {
        match (self, other) {
            (Self::Local(a), Self::Local(b)) => Arc::ptr_eq(a, b),
            (Self::Catalogue(a), Self::Catalogue(b)) => Arc::ptr_eq(a, b),
            (Self::Http(a), Self::Http(b)) => Arc::ptr_eq(a, b),
            (Self::Stub(a), Self::Stub(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn backend(&self) -> &dyn CatalogueBackend {
        match self {
            Self::Local(source) => source.as_ref(),
            Self::Catalogue(source) => source.backend(),
            Self::Http(source) => source.backend(),
            Self::Stub(stub) => stub.as_ref(),
        }
    }

    pub fn popular_manga(&self, page: u32) -> SourceResult<MangasPage> {
        self.backend().popular_manga(page)
    }

    pub fn supports_latest(&self) -> bool {
        self.backend().supports_latest()
    }

    pub fn latest_updates(&self, page: u32) -> SourceResult<MangasPage> {
        if let Self::Stub(stub) = self {
            return Err(stub.not_installed());
        }
        if !self.supports_latest() {
            return Err(SourceError::Unsupported { id: self.id(), operation: "latest updates" });
        }
        self.backend().latest_updates(page)
    }

    pub fn search_manga(&self, page: u32, query: &str) -> SourceResult<MangasPage> {
        self.backend().search_manga(page, query)
    }

    pub fn manga_details(&self, manga: &Manga) -> SourceResult<Manga> {
        self.backend().manga_details(manga)
    }

    pub fn chapter_list(&self, manga: &Manga) -> SourceResult<Vec<Chapter>> {
        self.backend().chapter_list(manga)
    }

    pub fn page_list(&self, chapter: &Chapter) -> SourceResult<Vec<Page>> {
        self.backend().page_list(chapter)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.info(), f)
    }
}
