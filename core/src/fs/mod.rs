//! File system access layer: directory listings, chapter archives, and atomic writes.

pub mod archive;
pub mod folder;
mod util;

pub use archive::{ArchiveEntry, list_archive_images, read_archive_entry};
pub use folder::{DirEntry, contains_images, list_entries, list_images};
pub use util::{
    Token, chapter_number, is_archive, is_hidden, is_supported_image, modified_ms, natural_cmp,
    natural_cmp_path, sanitize_relative_path, tokenize, write_atomic,
};

/// Shared result type for fs operations.
pub type Result<T> = crate::Result<T>;
