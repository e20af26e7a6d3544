use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;

use super::Result;

/// Supported image file extensions (lowercase, without the dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "avif", "gif", "bmp"];

/// Archive extensions the local source can page through.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["cbz", "zip"];

pub fn is_hidden(path: &Path) -> bool {
    path.file_name().and_then(OsStr::to_str).is_some_and(|name| name.starts_with('.'))
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| allowed.contains(&ext.to_ascii_lowercase().as_str()))
}

pub fn is_supported_image(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

pub fn is_archive(path: &Path) -> bool {
    has_extension(path, ARCHIVE_EXTENSIONS)
}

pub fn natural_cmp_path(a: &Path, b: &Path) -> Ordering {
    natural_cmp(&a.to_string_lossy().to_lowercase(), &b.to_string_lossy().to_lowercase())
}

/// Compare strings so that embedded numbers order by value ("ch2" < "ch10").
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a_tokens = tokenize(a);
    let b_tokens = tokenize(b);

    for (left, right) in a_tokens.iter().zip(b_tokens.iter()) {
        let ordering = match (left, right) {
            (Token::Number(l_digits, l_value), Token::Number(r_digits, r_value)) => {
                l_value.cmp(r_value).then_with(|| l_digits.len().cmp(&r_digits.len()))
            }
            (Token::Text(l_text), Token::Text(r_text)) => l_text.cmp(r_text),
            (Token::Number(..), Token::Text(..)) => Ordering::Less,
            (Token::Text(..), Token::Number(..)) => Ordering::Greater,
        };
        if ordering.is_ne() {
            return ordering;
        }
    }

    a_tokens.len().cmp(&b_tokens.len()).then_with(|| a.cmp(b))
}

#[derive(Debug, PartialEq)]
pub enum Token<'a> {
    Text(&'a str),
    Number(&'a str, u128),
}

pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut chars = input.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if !ch.is_ascii_digit() {
            continue;
        }
        if text_start < idx {
            tokens.push(Token::Text(&input[text_start..idx]));
        }
        let mut end = idx + 1;
        while let Some(&(next_idx, next)) = chars.peek() {
            if !next.is_ascii_digit() {
                break;
            }
            chars.next();
            end = next_idx + 1;
        }
        let digits = &input[idx..end];
        tokens.push(Token::Number(digits, digits.parse::<u128>().unwrap_or(0)));
        text_start = end;
    }

    if text_start < input.len() {
        tokens.push(Token::Text(&input[text_start..]));
    }

    tokens
}

/// Recognise a chapter number in a file or folder name.
///
/// The first numeric run wins; a directly following `.<digits>` is kept as the fractional part
/// so "Ch. 10.5" yields `10.5`. Returns `-1.0` when the name has no digits.
pub fn chapter_number(name: &str) -> f32 {
    let path = Path::new(name);
    let stem = if is_archive(path) {
        path.file_stem().and_then(OsStr::to_str).unwrap_or(name)
    } else {
        name
    };
    let tokens = tokenize(stem);
    let Some(position) = tokens.iter().position(|token| matches!(token, Token::Number(..))) else {
        return -1.0;
    };

    let Token::Number(whole, _) = tokens[position] else {
        return -1.0;
    };
    let fraction = match (tokens.get(position + 1), tokens.get(position + 2)) {
        (Some(&Token::Text(".")), Some(&Token::Number(digits, _))) => Some(digits),
        _ => None,
    };

    let literal = match fraction {
        Some(digits) => format!("{whole}.{digits}"),
        None => whole.to_string(),
    };
    literal.parse::<f32>().unwrap_or(-1.0)
}

/// Strip `.` components; reject absolute paths and `..` so the result stays under its root.
pub fn sanitize_relative_path(path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) | Component::RootDir => return None,
        }
    }

    if clean.as_os_str().is_empty() { None } else { Some(clean) }
}

/// Atomically replace `target` with `bytes` via a sibling temporary file.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let parent = target
        .parent()
        .ok_or_else(|| anyhow!("path {} does not have a parent directory", target.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("creating directory at {}", parent.display()))?;

    let mut temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("allocating temp file in {}", parent.display()))?;
    temp.write_all(bytes).with_context(|| format!("writing {}", target.display()))?;
    temp.flush().with_context(|| format!("flushing {}", target.display()))?;

    match temp.persist(target) {
        Ok(_) => Ok(()),
        Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
            match fs::remove_file(target) {
                Ok(()) => {}
                Err(remove_err) if remove_err.kind() == io::ErrorKind::NotFound => {}
                Err(remove_err) => return Err(remove_err.into()),
            }
            err.file.persist(target).map(|_| ()).map_err(|persist_err| persist_err.error.into())
        }
        Err(err) => Err(err.error.into()),
    }
}

/// Modification time in milliseconds since the Unix epoch, zero when unavailable.
pub fn modified_ms(path: &Path) -> u64 {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|time| time.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|delta| delta.as_millis() as u64)
        .unwrap_or(0)
}
