//! String-set preferences backing the cover metadata cache and other small state.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::fs::write_atomic;

use super::Result;

/// Key-value store holding string sets, the shape the cover metadata is persisted in.
pub trait PreferenceStore: Send + Sync + fmt::Debug {
    /// Values stored under `key`; an unknown key yields an empty set.
    fn string_set(&self, key: &str) -> Result<BTreeSet<String>>;

    /// Replace the set stored under `key`.
    fn set_string_set(&self, key: &str, values: BTreeSet<String>) -> Result<()>;
}

/// Process-local store, used by tests and hosts that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    sets: RwLock<BTreeMap<String, BTreeSet<String>>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn string_set(&self, key: &str) -> Result<BTreeSet<String>> {
        Ok(self.sets.read().get(key).cloned().unwrap_or_default())
    }

    fn set_string_set(&self, key: &str, values: BTreeSet<String>) -> Result<()> {
        self.sets.write().insert(key.to_string(), values);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PreferencesFile {
    #[serde(default)]
    string_sets: BTreeMap<String, BTreeSet<String>>,
}

/// Preferences stored in a single JSON document, rewritten atomically on every update.
#[derive(Debug)]
pub struct JsonPreferences {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonPreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<PreferencesFile> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("parsing preferences at {}", self.path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(PreferencesFile::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn write_file(&self, file: &PreferencesFile) -> Result<()> {
        let data = serde_json::to_vec_pretty(file)?;
        write_atomic(&self.path, &data)
            .with_context(|| format!("writing preferences at {}", self.path.display()))
    }
}

impl PreferenceStore for JsonPreferences {
    fn string_set(&self, key: &str) -> Result<BTreeSet<String>> {
        let _guard = self.lock.lock();
        let mut file = self.read_file()?;
        Ok(file.string_sets.remove(key).unwrap_or_default())
    }

    fn set_string_set(&self, key: &str, values: BTreeSet<String>) -> Result<()> {
        let _guard = self.lock.lock();
        let mut file = self.read_file()?;
        file.string_sets.insert(key.to_string(), values);
        self.write_file(&file)
    }
}
