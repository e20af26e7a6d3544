//! Shared data structures exchanged between the source registry, the cover cache, and callers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable numeric identifier of a content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(u64);

impl SourceId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for SourceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reserved identifier of the file-system backed local source.
pub const LOCAL_SOURCE_ID: SourceId = SourceId::new(0);

/// Identifier of a manga row owned by the library database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MangaId(i64);

impl MangaId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for MangaId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for MangaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity and display metadata shared by every source variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceInfo {
    pub id: SourceId,
    pub name: String,
    pub lang: String,
}

impl SourceInfo {
    pub fn new(id: SourceId, name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self { id, name: name.into(), lang: lang.into() }
    }

    /// Metadata for an id nobody has a name for.
    pub fn unnamed(id: SourceId) -> Self {
        Self { id, name: String::new(), lang: String::new() }
    }

    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.name.is_empty(), self.lang.is_empty()) {
            (true, _) => write!(f, "{}", self.id),
            (false, true) => f.write_str(&self.name),
            (false, false) => write!(f, "{} ({})", self.name, self.lang.to_uppercase()),
        }
    }
}

/// Publication state reported by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MangaStatus {
    #[default]
    Unknown,
    Ongoing,
    Completed,
    Licensed,
    PublishingFinished,
    Cancelled,
    OnHiatus,
}

impl MangaStatus {
    /// Map the integer codes used by extension metadata and `details.json` files.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Ongoing,
            2 => Self::Completed,
            3 => Self::Licensed,
            4 => Self::PublishingFinished,
            5 => Self::Cancelled,
            6 => Self::OnHiatus,
            _ => Self::Unknown,
        }
    }
}

/// Manga as seen by a source; `url` is the source-relative key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Manga {
    pub url: String,
    pub title: String,
    pub artist: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub genres: Vec<String>,
    pub status: MangaStatus,
    pub thumbnail_url: Option<String>,
    pub initialized: bool,
}

impl Manga {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self { url: url.into(), title: title.into(), ..Self::default() }
    }
}

/// One page of browse or search results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MangasPage {
    pub mangas: Vec<Manga>,
    pub has_next_page: bool,
}

impl MangasPage {
    pub fn last(mangas: Vec<Manga>) -> Self {
        Self { mangas, has_next_page: false }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chapter {
    pub url: String,
    pub name: String,
    /// Negative when the number could not be recognised.
    pub chapter_number: f32,
    /// Milliseconds since the Unix epoch.
    pub date_upload: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    pub index: u32,
    pub url: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    /// Width over height, or `None` when either side is zero.
    pub fn aspect_ratio(self) -> Option<f32> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(self.width as f32 / self.height as f32)
    }
}

/// Packed 0xAARRGGBB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Argb(pub u32);

impl Argb {
    pub const WHITE: Argb = Argb(0xFFFF_FFFF);
    pub const BLACK: Argb = Argb(0xFF00_0000);

    pub const fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self(0xFF00_0000 | (red as u32) << 16 | (green as u32) << 8 | blue as u32)
    }

    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn blue(self) -> u8 {
        self.0 as u8
    }

    /// Two's complement view, matching how color ints were historically persisted.
    pub const fn to_signed(self) -> i32 {
        self.0 as i32
    }

    pub const fn from_signed(value: i32) -> Self {
        Self(value as u32)
    }
}

/// Dominant cover color and a text color readable on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoverColors {
    pub color: Argb,
    pub text_color: Argb,
}

impl CoverColors {
    pub fn new(color: Argb, text_color: Argb) -> Self {
        Self { color, text_color }
    }
}
