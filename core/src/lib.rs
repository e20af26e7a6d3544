//! Core services of the manga library: the live source registry, cover metadata, storage, and the
//! local folder source.

#![deny(missing_debug_implementations)]

pub mod cache;
pub mod codec;
pub mod config;
pub mod context;
pub mod cover;
pub mod fs;
pub mod log;
pub mod source;
pub mod storage;
pub mod store;
pub mod types;

pub type Result<T> = std::result::Result<T, anyhow::Error>;

pub use config::CoreConfig;
pub use context::CoreContext;
pub use cover::{CoverMetadataCache, CoverOutcome, CoverRequest};
pub use source::{
    Extension, ExtensionFeed, Source, SourceError, SourceRegistry, SourceResult, extension_feed,
};
pub use storage::StorageManager;
pub use types::{
    Argb, Chapter, CoverColors, ImageDimensions, LOCAL_SOURCE_ID, Manga, MangaId, MangaStatus,
    MangasPage, Page, SourceId, SourceInfo,
};

/// Returns the version of the core crate for telemetry and debugging.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
