use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
use manga_core::cache::CoverCache;
use manga_core::cover::{
    COVER_COLORS_KEY, COVER_RATIOS_KEY, CoverMetadataCache, CoverOutcome, CoverRequest,
};
use manga_core::store::{JsonPreferences, MemoryPreferences, PreferenceStore};
use manga_core::types::{Argb, CoverColors, MangaId};

fn png(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
    let image = ImageBuffer::from_pixel(width, height, Rgba(pixel));
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image).write_to(&mut cursor, ImageFormat::Png).expect("encode png");
    cursor.into_inner()
}

/// Provider returning `bytes` and counting how often it was asked.
fn counting(
    bytes: Vec<u8>,
    calls: &Arc<AtomicUsize>,
) -> impl FnOnce() -> manga_core::Result<Vec<u8>> + Send + 'static {
    let calls = Arc::clone(calls);
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(bytes)
    }
}

fn dark_red() -> Vec<u8> {
    png(30, 45, [200, 30, 30, 255])
}

#[tokio::test]
async fn favorite_cover_is_computed_once() {
    let cache = CoverMetadataCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let id = MangaId::new(1);

    let request = CoverRequest::new(id, true);
    let outcome = cache.compute_and_store(request, counting(dark_red(), &calls)).await;
    let CoverOutcome::Computed { ratio, colors } = outcome else {
        panic!("expected a computed outcome, got {outcome:?}");
    };
    let ratio = ratio.expect("ratio");
    assert!((ratio - 30.0 / 45.0).abs() < 1e-6);
    let colors = colors.expect("colors");
    assert!(colors.color.red().abs_diff(200) <= 2);
    assert_eq!(colors.text_color, Argb::WHITE);

    assert_eq!(cache.ratio(id), Some(ratio));
    assert_eq!(cache.colors(id), Some(colors));

    let again = cache.compute_and_store(request, counting(dark_red(), &calls)).await;
    assert_eq!(again, CoverOutcome::Skipped);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_favorites_are_evicted_and_never_cached() {
    let cache = CoverMetadataCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let id = MangaId::new(2);
    cache.set_ratio(id, 1.2);
    cache.set_colors(id, CoverColors::new(Argb::BLACK, Argb::WHITE));

    let request = CoverRequest::new(id, false);
    let outcome = cache.compute_and_store(request, counting(dark_red(), &calls)).await;
    assert!(matches!(outcome, CoverOutcome::Computed { colors: Some(_), .. }));
    assert_eq!(cache.ratio(id), None);
    assert_eq!(cache.colors(id), None);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn caller_supplied_colors_skip_the_decode() {
    let cache = CoverMetadataCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let known = CoverColors::new(Argb::BLACK, Argb::WHITE);

    let request = CoverRequest::new(MangaId::new(3), false).with_existing_colors(Some(known));
    let outcome = cache.compute_and_store(request, counting(dark_red(), &calls)).await;
    assert_eq!(outcome, CoverOutcome::Skipped);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_ratio_only_reads_the_header() {
    let cache = CoverMetadataCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let id = MangaId::new(4);
    let known = CoverColors::new(Argb::BLACK, Argb::WHITE);
    cache.set_colors(id, known);

    let request = CoverRequest::new(id, true);
    let outcome = cache.compute_and_store(request, counting(dark_red(), &calls)).await;
    let CoverOutcome::Computed { ratio, colors } = outcome else {
        panic!("expected a computed outcome, got {outcome:?}");
    };
    assert!(ratio.is_some());
    assert_eq!(colors, None);
    assert_eq!(cache.colors(id), Some(known));
    assert_eq!(cache.ratio(id), ratio);
}

#[tokio::test]
async fn forced_requests_replace_cached_values() {
    let cache = CoverMetadataCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let id = MangaId::new(5);
    cache.set_ratio(id, 2.0);
    cache.set_colors(id, CoverColors::new(Argb::BLACK, Argb::WHITE));

    let request = CoverRequest::new(id, true).forced();
    let light = png(40, 20, [250, 250, 250, 255]);
    let outcome = cache.compute_and_store(request, counting(light, &calls)).await;
    assert!(matches!(outcome, CoverOutcome::Computed { .. }));
    assert_eq!(cache.ratio(id), Some(2.0 / 1.0));
    assert_eq!(cache.colors(id).map(|c| c.text_color), Some(Argb::BLACK));
}

#[tokio::test]
async fn unreadable_covers_leave_the_cache_untouched() {
    let cache = CoverMetadataCache::new();
    let id = MangaId::new(6);

    let outcome = cache
        .compute_and_store(CoverRequest::new(id, true), || Err(anyhow!("thumbnail not cached")))
        .await;
    assert_eq!(outcome, CoverOutcome::Unavailable);

    let outcome = cache
        .compute_and_store(CoverRequest::new(id, true), || Ok(b"not an image".to_vec()))
        .await;
    assert_eq!(outcome, CoverOutcome::Unavailable);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn cover_cache_feeds_the_metadata_cache() {
    let temp = tempfile::tempdir().unwrap();
    let covers = Arc::new(CoverCache::new(temp.path()).unwrap());
    let metadata = CoverMetadataCache::new();
    let id = MangaId::new(7);
    covers.write_custom_cover(id, &png(10, 40, [20, 20, 20, 255])).unwrap();

    let provider = covers.provider(id, None);
    let outcome = metadata.compute_and_store(CoverRequest::new(id, true), provider).await;
    assert!(matches!(outcome, CoverOutcome::Computed { .. }));
    assert_eq!(metadata.ratio(id), Some(0.25));
}

#[test]
fn persisted_entries_survive_a_restart() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("state").join("preferences.json");
    let colors = CoverColors::new(Argb::from_rgb(0x10, 0x20, 0x30), Argb::WHITE);

    {
        let store = JsonPreferences::new(&path);
        let cache = CoverMetadataCache::new();
        cache.set_ratio(MangaId::new(1), 0.7);
        cache.set_colors(MangaId::new(1), colors);
        cache.set_ratio(MangaId::new(2), 1.5);
        cache.persist(&store).unwrap();
    }

    let store = JsonPreferences::new(&path);
    let ratios = store.string_set(COVER_RATIOS_KEY).unwrap();
    assert!(ratios.contains("2|1.5"));
    let stored_colors = store.string_set(COVER_COLORS_KEY).unwrap();
    assert!(stored_colors.contains("1|-15720400|-1"));

    let cache = CoverMetadataCache::new();
    let summary = cache.load(&store);
    assert_eq!((summary.ratios, summary.colors, summary.dropped), (2, 1, 0));
    assert_eq!(cache.ratio(MangaId::new(1)), Some(0.7));
    assert_eq!(cache.colors(MangaId::new(1)), Some(colors));
}

#[test]
fn removed_entries_are_gone_after_persist() {
    let store = MemoryPreferences::new();
    let cache = CoverMetadataCache::new();
    cache.set_ratio(MangaId::new(1), 0.7);
    cache.set_ratio(MangaId::new(2), 0.8);
    cache.persist(&store).unwrap();

    cache.remove(MangaId::new(1));
    cache.persist(&store).unwrap();

    let reloaded = CoverMetadataCache::new();
    reloaded.load(&store);
    assert_eq!(reloaded.ratio(MangaId::new(1)), None);
    assert_eq!(reloaded.ratio(MangaId::new(2)), Some(0.8));
}
