//! On-disk caches.

pub mod cover;
pub mod disk;

pub use cover::CoverCache;
pub use disk::DiskCache;

pub type Result<T> = crate::Result<T>;
