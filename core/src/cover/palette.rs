//! Dominant color and readable text color for a cover.

use crate::codec::DecodedImage;
use crate::types::{Argb, CoverColors};

/// Bits kept per channel when bucketing pixels.
const QUANTIZE_BITS: u32 = 4;
const BUCKETS: usize = 1 << (QUANTIZE_BITS * 3);
/// Pixels more transparent than this do not vote.
const MIN_ALPHA: u8 = 128;

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    population: u32,
    red: u64,
    green: u64,
    blue: u64,
}

fn bucket_index(red: u8, green: u8, blue: u8) -> usize {
    let shift = 8 - QUANTIZE_BITS;
    ((red as usize >> shift) << (QUANTIZE_BITS * 2))
        | ((green as usize >> shift) << QUANTIZE_BITS)
        | (blue as usize >> shift)
}

/// Most common color of the image and a text color that reads on top of it.
///
/// Pixels are bucketed by their high bits; the most populated bucket wins (lowest index on a
/// tie) and its members are averaged. `None` when no pixel is opaque enough to vote.
pub fn extract(image: &DecodedImage) -> Option<CoverColors> {
    let mut buckets = vec![Bucket::default(); BUCKETS];
    for px in image.pixels().chunks_exact(4) {
        if px[3] < MIN_ALPHA {
            continue;
        }
        let bucket = &mut buckets[bucket_index(px[0], px[1], px[2])];
        bucket.population += 1;
        bucket.red += px[0] as u64;
        bucket.green += px[1] as u64;
        bucket.blue += px[2] as u64;
    }

    let mut dominant: Option<&Bucket> = None;
    for bucket in buckets.iter().filter(|bucket| bucket.population > 0) {
        if dominant.is_none_or(|best| bucket.population > best.population) {
            dominant = Some(bucket);
        }
    }

    let bucket = dominant?;
    let count = bucket.population as u64;
    let color = Argb::from_rgb(
        (bucket.red / count) as u8,
        (bucket.green / count) as u8,
        (bucket.blue / count) as u8,
    );
    Some(CoverColors::new(color, text_color_for(color)))
}

/// White or black, whichever contrasts more with `background`.
pub fn text_color_for(background: Argb) -> Argb {
    if contrast_ratio(Argb::WHITE, background) >= contrast_ratio(Argb::BLACK, background) {
        Argb::WHITE
    } else {
        Argb::BLACK
    }
}

/// WCAG contrast ratio between two opaque colors, from 1.0 to 21.0.
pub fn contrast_ratio(a: Argb, b: Argb) -> f64 {
    let (la, lb) = (relative_luminance(a), relative_luminance(b));
    let (lighter, darker) = if la >= lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

fn relative_luminance(color: Argb) -> f64 {
    fn linear(channel: u8) -> f64 {
        let value = channel as f64 / 255.0;
        if value <= 0.03928 { value / 12.92 } else { ((value + 0.055) / 1.055).powf(2.4) }
    }
    0.2126 * linear(color.red()) + 0.7152 * linear(color.green()) + 0.0722 * linear(color.blue())
}
