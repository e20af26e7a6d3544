//! Disk-backed blob cache with a sharded directory layout.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::fs::write_atomic;

use super::Result;

const SHARD_LEN: usize = 2;

/// Stores opaque bytes under `<root>/<aa>/<bb>/<rest of blake3 hex>.bin`.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Create or reuse a disk cache rooted at the provided path.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("creating cache root directory at {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location of `key`, whether or not it is cached.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let hex = blake3::hash(key.as_bytes()).to_hex();
        let (shard_one, remainder) = hex.as_str().split_at(SHARD_LEN);
        let (shard_two, remainder) = remainder.split_at(SHARD_LEN);
        self.root.join(shard_one).join(shard_two).join(format!("{remainder}.bin"))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    pub fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Persist bytes for `key`, returning the final path.
    pub fn write(&self, key: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(key);
        write_atomic(&path, bytes)?;
        Ok(path)
    }

    /// Remove an entry; returns whether something was deleted.
    pub fn remove(&self, key: &str) -> Result<bool> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
