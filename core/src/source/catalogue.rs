//! Extension-provided sources and the capability trait they implement.

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;

use crate::types::{Chapter, Manga, MangasPage, Page, SourceInfo};

use super::error::SourceResult;

/// Browse and fetch operations of a source.
///
/// Implementations may block on I/O; async callers should run them on a blocking pool.
pub trait CatalogueBackend: Send + Sync + fmt::Debug {
    fn popular_manga(&self, page: u32) -> SourceResult<MangasPage>;

    fn supports_latest(&self) -> bool {
        false
    }

    /// Only called when [`supports_latest`](Self::supports_latest) is true.
    fn latest_updates(&self, _page: u32) -> SourceResult<MangasPage> {
        Err(anyhow!("latest updates are not implemented").into())
    }

    fn search_manga(&self, page: u32, query: &str) -> SourceResult<MangasPage>;

    fn manga_details(&self, manga: &Manga) -> SourceResult<Manga>;

    fn chapter_list(&self, manga: &Manga) -> SourceResult<Vec<Chapter>>;

    fn page_list(&self, chapter: &Chapter) -> SourceResult<Vec<Page>>;
}

/// A browsable source contributed by an extension.
#[derive(Debug)]
pub struct CatalogueSource {
    info: SourceInfo,
    backend: Arc<dyn CatalogueBackend>,
}

impl CatalogueSource {
    pub fn new(info: SourceInfo, backend: Arc<dyn CatalogueBackend>) -> Self {
        Self { info, backend }
    }

    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    pub fn backend(&self) -> &dyn CatalogueBackend {
        self.backend.as_ref()
    }
}

/// A catalogue source that talks to a website.
#[derive(Debug)]
pub struct HttpSource {
    info: SourceInfo,
    base_url: String,
    version_id: u32,
    backend: Arc<dyn CatalogueBackend>,
}

impl HttpSource {
    pub fn new(
        info: SourceInfo,
        base_url: impl Into<String>,
        backend: Arc<dyn CatalogueBackend>,
    ) -> Self {
        Self { info, base_url: base_url.into(), version_id: 1, backend }
    }

    /// Bumped by extensions when a site change invalidates stored URLs.
    pub fn with_version_id(mut self, version_id: u32) -> Self {
        self.version_id = version_id;
        self
    }

    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn version_id(&self) -> u32 {
        self.version_id
    }

    pub fn backend(&self) -> &dyn CatalogueBackend {
        self.backend.as_ref()
    }

    /// Absolute URL for a source-relative path.
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}
