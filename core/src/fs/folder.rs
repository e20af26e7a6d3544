//! Directory enumeration for the local source: manga folders, chapter folders, and pages.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};

use super::{Result, util};

/// Visible entry of a directory listing, with its modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
    pub modified_ms: u64,
}

/// List visible entries directly under `root`, naturally sorted by name.
///
/// A missing `root` yields an empty listing.
pub fn list_entries(root: &Path) -> Result<Vec<DirEntry>> {
    let reader = match fs::read_dir(root) {
        Ok(reader) => reader,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("reading directory {}", root.display()));
        }
    };

    let mut entries = Vec::new();
    for entry in reader {
        let entry = entry?;
        let path = entry.path();
        if util::is_hidden(&path) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()).map(str::to_owned) else {
            continue;
        };
        let is_dir = entry.file_type()?.is_dir();
        let modified_ms = util::modified_ms(&path);
        entries.push(DirEntry { name, path, is_dir, modified_ms });
    }

    entries.sort_by(|a, b| util::natural_cmp(&a.name.to_lowercase(), &b.name.to_lowercase()));
    Ok(entries)
}

/// Image files directly inside `dir`, relative to it, in natural reading order.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(anyhow!("folder {:?} is not a directory", dir));
    }

    let images = list_entries(dir)?
        .into_iter()
        .filter(|entry| !entry.is_dir && util::is_supported_image(&entry.path))
        .map(|entry| PathBuf::from(entry.name))
        .collect();
    Ok(images)
}

/// Whether `dir` directly contains at least one supported image.
pub fn contains_images(dir: &Path) -> bool {
    list_images(dir).map(|images| !images.is_empty()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn filters_and_sorts_pages() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for name in ["10.jpg", "2.png", "001.jpeg", "cover.bmp", "notes.txt", ".hidden.png"] {
            fs::write(root.join(name), b"test").unwrap();
        }

        let images = list_images(root).expect("list pages");
        let order: Vec<String> =
            images.iter().map(|path| path.to_string_lossy().into_owned()).collect();
        assert_eq!(order, vec!["001.jpeg", "2.png", "10.jpg", "cover.bmp"]);
    }

    #[test]
    fn missing_root_lists_nothing() {
        let dir = tempdir().unwrap();
        assert!(list_entries(&dir.path().join("absent")).unwrap().is_empty());
        assert!(!contains_images(&dir.path().join("absent")));
    }

    #[test]
    fn entries_report_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("Chapter 10")).unwrap();
        fs::create_dir(dir.path().join("Chapter 2")).unwrap();
        fs::write(dir.path().join("details.json"), b"{}").unwrap();

        let entries = list_entries(dir.path()).unwrap();
        let names: Vec<(&str, bool)> =
            entries.iter().map(|entry| (entry.name.as_str(), entry.is_dir)).collect();
        assert_eq!(names, vec![("Chapter 2", true), ("Chapter 10", true), ("details.json", false)]);
    }
}
