//! ZIP/CBZ chapter archives.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use zip::CompressionMethod;
use zip::read::ZipArchive;

use super::{Result, util};

/// Image stored inside a chapter archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub compressed: bool,
}

fn open(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path).with_context(|| format!("opening archive {:?}", path))?;
    ZipArchive::new(file).map_err(|err| anyhow!("reading archive {:?}: {err}", path))
}

/// Image entries of the archive in natural reading order.
pub fn list_archive_images(path: &Path) -> Result<Vec<ArchiveEntry>> {
    let mut archive = open(path)?;
    let mut entries: Vec<ArchiveEntry> = Vec::new();

    for idx in 0..archive.len() {
        let file = archive.by_index(idx).map_err(|err| anyhow!("{}", err))?;
        if file.is_dir() {
            continue;
        }

        let Some(sanitized) = file.enclosed_name().and_then(util::sanitize_relative_path) else {
            continue;
        };
        if util::is_hidden(&sanitized) || !util::is_supported_image(&sanitized) {
            continue;
        }

        entries.push(ArchiveEntry {
            path: sanitized,
            size_bytes: file.size(),
            compressed: file.compression() != CompressionMethod::Stored,
        });
    }

    entries.sort_by(|a, b| util::natural_cmp_path(&a.path, &b.path));
    Ok(entries)
}

/// Read the bytes of one entry, addressed by its sanitized path.
pub fn read_archive_entry(path: &Path, entry: &Path) -> Result<Vec<u8>> {
    let mut archive = open(path)?;
    let name = entry.to_string_lossy().replace('\\', "/");
    let mut file = archive
        .by_name(&name)
        .map_err(|err| anyhow!("entry {name} in archive {:?}: {err}", path))?;
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes).with_context(|| format!("reading {name} from {:?}", path))?;
    Ok(bytes)
}
