//! Process-scoped cache of cover aspect ratios and colors.
//!
//! Library layouts need a cover's aspect ratio before the image loads and tint their chrome with
//! the cover's dominant color. Both are expensive to derive (a full decode) and cheap to keep, so
//! they are computed once per favorited manga, held in memory, and persisted as two string sets:
//!
//! * ratios: `"<manga id>|<width / height>"`
//! * colors: `"<manga id>|<color>|<text color>"`, colors as signed 32-bit decimal ARGB
//!
//! Entries that fail to parse are dropped one by one on load. Manga that leave the library lose
//! their entries.

use std::collections::BTreeSet;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::store::PreferenceStore;
use crate::types::{Argb, CoverColors, MangaId};

use super::analysis::{CoverAnalysis, DecodeMode, analyze_cover};
use super::Result;

pub const COVER_RATIOS_KEY: &str = "cover_ratios";
pub const COVER_COLORS_KEY: &str = "cover_colors";
const FIELD_SEPARATOR: char = '|';

/// Cached metadata of one manga.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoverMetadataEntry {
    pub ratio: Option<f32>,
    pub colors: Option<CoverColors>,
}

/// Input of [`CoverMetadataCache::compute_and_store`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverRequest {
    pub manga_id: MangaId,
    pub favorite: bool,
    /// Ratio the caller already knows about, e.g. from its own row.
    pub existing_ratio: Option<f32>,
    /// Colors the caller already knows about.
    pub existing_colors: Option<CoverColors>,
    /// Recompute even when colors are already known (the cover changed).
    pub force: bool,
}

impl CoverRequest {
    pub fn new(manga_id: MangaId, favorite: bool) -> Self {
        Self { manga_id, favorite, existing_ratio: None, existing_colors: None, force: false }
    }

    pub fn with_existing_ratio(mut self, ratio: Option<f32>) -> Self {
        self.existing_ratio = ratio;
        self
    }

    pub fn with_existing_colors(mut self, colors: Option<CoverColors>) -> Self {
        self.existing_colors = colors;
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// What [`CoverMetadataCache::compute_and_store`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoverOutcome {
    /// Everything needed was already known; nothing was decoded.
    Skipped,
    /// The cover was decoded. Values are cached only for favorited manga.
    Computed { ratio: Option<f32>, colors: Option<CoverColors> },
    /// The cover could not be read or decoded; the cache is unchanged.
    Unavailable,
}

/// Counts reported by [`CoverMetadataCache::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSummary {
    pub ratios: usize,
    pub colors: usize,
    pub dropped: usize,
}

#[derive(Debug, Default)]
pub struct CoverMetadataCache {
    ratios: DashMap<MangaId, f32>,
    colors: DashMap<MangaId, CoverColors>,
}

impl CoverMetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the persisted sets into memory, overwriting entries with the same id.
    ///
    /// A store that cannot be read counts as empty; malformed entries are skipped.
    pub fn load(&self, store: &dyn PreferenceStore) -> LoadSummary {
        let mut summary = LoadSummary::default();

        for raw in read_set(store, COVER_RATIOS_KEY) {
            match parse_ratio(&raw) {
                Some((id, ratio)) => {
                    self.ratios.insert(id, ratio);
                    summary.ratios += 1;
                }
                None => summary.dropped += 1,
            }
        }

        for raw in read_set(store, COVER_COLORS_KEY) {
            match parse_colors(&raw) {
                Some((id, colors)) => {
                    self.colors.insert(id, colors);
                    summary.colors += 1;
                }
                None => summary.dropped += 1,
            }
        }

        if summary.dropped > 0 {
            warn!(dropped = summary.dropped, "skipped malformed cover metadata entries");
        }
        debug!(ratios = summary.ratios, colors = summary.colors, "loaded cover metadata");
        summary
    }

    /// Write both maps to `store`, replacing what was there.
    pub fn persist(&self, store: &dyn PreferenceStore) -> Result<()> {
        let ratios: BTreeSet<String> =
            self.ratios.iter().map(|entry| encode_ratio(*entry.key(), *entry.value())).collect();
        let colors: BTreeSet<String> =
            self.colors.iter().map(|entry| encode_colors(*entry.key(), *entry.value())).collect();

        debug!(ratios = ratios.len(), colors = colors.len(), "persisting cover metadata");
        store.set_string_set(COVER_RATIOS_KEY, ratios)?;
        store.set_string_set(COVER_COLORS_KEY, colors)?;
        Ok(())
    }

    pub fn ratio(&self, id: MangaId) -> Option<f32> {
        self.ratios.get(&id).map(|ratio| *ratio)
    }

    pub fn colors(&self, id: MangaId) -> Option<CoverColors> {
        self.colors.get(&id).map(|colors| *colors)
    }

    pub fn entry(&self, id: MangaId) -> CoverMetadataEntry {
        CoverMetadataEntry { ratio: self.ratio(id), colors: self.colors(id) }
    }

    /// Record a ratio measured elsewhere. Non-finite or non-positive ratios are ignored.
    pub fn set_ratio(&self, id: MangaId, ratio: f32) -> bool {
        if !is_usable_ratio(ratio) {
            return false;
        }
        self.ratios.insert(id, ratio);
        true
    }

    pub fn set_colors(&self, id: MangaId, colors: CoverColors) {
        self.colors.insert(id, colors);
    }

    pub fn remove(&self, id: MangaId) {
        self.ratios.remove(&id);
        self.colors.remove(&id);
    }

    /// Number of manga with at least one cached attribute.
    pub fn len(&self) -> usize {
        let mut ids: BTreeSet<MangaId> = self.ratios.iter().map(|entry| *entry.key()).collect();
        ids.extend(self.colors.iter().map(|entry| *entry.key()));
        ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty() && self.colors.is_empty()
    }

    /// Derive and cache the cover attributes of one manga.
    ///
    /// Non-favorited manga are evicted first and never cached; their computed colors are only
    /// returned. Known colors short-circuit the decode unless `force` is set, except that a
    /// favorited manga missing its ratio still gets a header-only read for the dimensions.
    /// `provider` yields the encoded cover and runs, with the decode, on the blocking pool.
    pub async fn compute_and_store<F>(&self, request: CoverRequest, provider: F) -> CoverOutcome
    where
        F: FnOnce() -> Result<Vec<u8>> + Send + 'static,
    {
        let id = request.manga_id;
        if !request.favorite {
            self.remove(id);
        }

        let known_colors = request
            .existing_colors
            .or_else(|| if request.favorite { self.colors(id) } else { None });
        let known_ratio = request.existing_ratio.or_else(|| self.ratio(id));

        let needs_colors = request.force || known_colors.is_none();
        let needs_ratio = request.favorite && (request.force || known_ratio.is_none());
        if !needs_colors && !needs_ratio {
            return CoverOutcome::Skipped;
        }

        let mode = if needs_colors { DecodeMode::Sampled } else { DecodeMode::Bounds };
        let analysis = tokio::task::spawn_blocking(move || -> Result<CoverAnalysis> {
            let bytes = provider()?;
            analyze_cover(&bytes, mode)
        })
        .await;

        let analysis = match analysis {
            Ok(Ok(analysis)) => analysis,
            Ok(Err(err)) => {
                debug!(manga = %id, "cover metadata unavailable: {err:#}");
                return CoverOutcome::Unavailable;
            }
            Err(err) => {
                warn!(manga = %id, "cover analysis task failed: {err}");
                return CoverOutcome::Unavailable;
            }
        };

        let ratio = analysis.dimensions.aspect_ratio();
        if request.favorite {
            if let Some(colors) = analysis.colors {
                self.colors.insert(id, colors);
            }
            if needs_ratio {
                if let Some(ratio) = ratio {
                    self.ratios.insert(id, ratio);
                }
            }
        }

        CoverOutcome::Computed { ratio, colors: analysis.colors }
    }
}

fn read_set(store: &dyn PreferenceStore, key: &str) -> BTreeSet<String> {
    store.string_set(key).unwrap_or_else(|err| {
        warn!(key, "cover metadata store unreadable, starting empty: {err:#}");
        BTreeSet::new()
    })
}

fn is_usable_ratio(ratio: f32) -> bool {
    ratio.is_finite() && ratio > 0.0
}

pub fn encode_ratio(id: MangaId, ratio: f32) -> String {
    format!("{id}{FIELD_SEPARATOR}{ratio}")
}

pub fn encode_colors(id: MangaId, colors: CoverColors) -> String {
    format!(
        "{id}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
        colors.color.to_signed(),
        colors.text_color.to_signed()
    )
}

/// Parse `"<id>|<ratio>"`. Ratios must be finite and strictly positive.
pub fn parse_ratio(raw: &str) -> Option<(MangaId, f32)> {
    let (id, ratio) = raw.split_once(FIELD_SEPARATOR)?;
    let id = id.trim().parse::<i64>().ok()?;
    let ratio = ratio.trim().parse::<f32>().ok().filter(|ratio| is_usable_ratio(*ratio))?;
    Some((MangaId::new(id), ratio))
}

/// Parse `"<id>|<color>|<text color>"`; colors may be signed or unsigned decimal.
pub fn parse_colors(raw: &str) -> Option<(MangaId, CoverColors)> {
    let mut fields = raw.split(FIELD_SEPARATOR);
    let id = fields.next()?.trim().parse::<i64>().ok()?;
    let color = parse_argb(fields.next()?)?;
    let text_color = parse_argb(fields.next()?)?;
    if fields.next().is_some() {
        return None;
    }
    Some((MangaId::new(id), CoverColors::new(color, text_color)))
}

fn parse_argb(raw: &str) -> Option<Argb> {
    let raw = raw.trim();
    raw.parse::<i32>()
        .map(Argb::from_signed)
        .or_else(|_| raw.parse::<u32>().map(Argb))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPreferences;

    fn store_with(ratios: &[&str], colors: &[&str]) -> MemoryPreferences {
        let store = MemoryPreferences::new();
        store
            .set_string_set(COVER_RATIOS_KEY, ratios.iter().map(|s| s.to_string()).collect())
            .unwrap();
        store
            .set_string_set(COVER_COLORS_KEY, colors.iter().map(|s| s.to_string()).collect())
            .unwrap();
        store
    }

    #[test]
    fn load_tolerates_malformed_entries() {
        let cache = CoverMetadataCache::new();
        let summary = cache.load(&store_with(&["5|1.5", "bogus", "7|0.0"], &[]));

        assert_eq!(cache.ratio(MangaId::new(5)), Some(1.5));
        // Zero is parseable but degenerate; it is treated like any other unusable ratio.
        assert_eq!(cache.ratio(MangaId::new(7)), None);
        assert_eq!(summary, LoadSummary { ratios: 1, colors: 0, dropped: 2 });
    }

    #[test]
    fn ratio_parsing_rejects_non_finite_and_extra_fields() {
        assert_eq!(parse_ratio("3|0.75"), Some((MangaId::new(3), 0.75)));
        assert_eq!(parse_ratio("3|NaN"), None);
        assert_eq!(parse_ratio("3|inf"), None);
        assert_eq!(parse_ratio("3|-1.0"), None);
        assert_eq!(parse_ratio("x|1.0"), None);
        assert_eq!(parse_ratio("3|1.0|2"), None);
        assert_eq!(parse_ratio("3"), None);
    }

    #[test]
    fn color_parsing_accepts_signed_and_unsigned() {
        let expected = CoverColors::new(Argb(0xFF10_2030), Argb::WHITE);
        assert_eq!(parse_colors("9|-15720400|-1"), Some((MangaId::new(9), expected)));
        assert_eq!(parse_colors("9|4279246896|4294967295"), Some((MangaId::new(9), expected)));
        assert_eq!(parse_colors("9|-1"), None);
        assert_eq!(parse_colors("9|-1|-1|-1"), None);
        assert_eq!(parse_colors("9|red|-1"), None);
    }

    #[test]
    fn encoding_matches_persisted_format() {
        assert_eq!(encode_ratio(MangaId::new(5), 1.5), "5|1.5");
        let colors = CoverColors::new(Argb::BLACK, Argb::WHITE);
        assert_eq!(encode_colors(MangaId::new(12), colors), "12|-16777216|-1");
    }

    #[test]
    fn remove_evicts_both_attributes() {
        let cache = CoverMetadataCache::new();
        let id = MangaId::new(1);
        assert!(cache.set_ratio(id, 0.7));
        cache.set_colors(id, CoverColors::new(Argb::BLACK, Argb::WHITE));
        assert_eq!(cache.len(), 1);

        cache.remove(id);
        cache.remove(id);
        assert_eq!(cache.entry(id), CoverMetadataEntry::default());
        assert!(cache.is_empty());
    }

    #[test]
    fn set_ratio_ignores_degenerate_values() {
        let cache = CoverMetadataCache::new();
        assert!(!cache.set_ratio(MangaId::new(1), 0.0));
        assert!(!cache.set_ratio(MangaId::new(1), f32::NAN));
        assert_eq!(cache.ratio(MangaId::new(1)), None);
    }

    #[test]
    fn load_overwrites_without_clearing() {
        let cache = CoverMetadataCache::new();
        cache.set_ratio(MangaId::new(1), 2.0);
        cache.set_ratio(MangaId::new(2), 3.0);

        let store = store_with(&["1|0.5"], &[]);
        cache.load(&store);
        cache.load(&store);

        assert_eq!(cache.ratio(MangaId::new(1)), Some(0.5));
        assert_eq!(cache.ratio(MangaId::new(2)), Some(3.0));
    }
}
