//! Cover decoding: header-only bounds and shrunk RGBA samples for color extraction.

use std::io::Cursor;

use anyhow::{Context, anyhow, ensure};
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, Limits, RgbaImage};
use moxcms::{CmsError, ColorProfile, Layout, TransformOptions};
use tracing::warn;

use crate::types::ImageDimensions;

use super::Result;
use super::resize::downsample;

/// Straight-alpha RGBA8888 pixels, row-major from the top-left corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub dimensions: ImageDimensions,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

fn decoder_for(data: &[u8]) -> Result<impl ImageDecoder + '_> {
    ensure!(!data.is_empty(), "empty cover image data");
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("guessing cover image format")?
        .into_decoder()
        .context("constructing cover decoder")
}

fn swaps_axes(orientation: Orientation) -> bool {
    matches!(
        orientation,
        Orientation::Rotate90
            | Orientation::Rotate270
            | Orientation::Rotate90FlipH
            | Orientation::Rotate270FlipH
    )
}

/// Displayed dimensions read from the image header, without decoding pixels.
///
/// EXIF rotations by a quarter turn swap width and height, matching what [`decode_sample`]
/// reports.
pub fn read_dimensions(data: &[u8]) -> Result<ImageDimensions> {
    let mut decoder = decoder_for(data)?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let (width, height) = decoder.dimensions();
    if swaps_axes(orientation) {
        Ok(ImageDimensions { width: height, height: width })
    } else {
        Ok(ImageDimensions { width, height })
    }
}

/// Decode a cover only to sample its colors.
///
/// JPEG, PNG, WebP, and GIF (first frame) are supported. The frame is shrunk to `max_edge`
/// straight after decoding, so orientation and ICC conversion only touch the sample, and frames
/// needing more than [`SAMPLE_MAX_ALLOC`] bytes are refused. A broken ICC profile only logs a
/// warning. Returns the displayed dimensions of the full cover with the sample.
pub fn decode_sample(data: &[u8], max_edge: u32) -> Result<(ImageDimensions, DecodedImage)> {
    let mut limits = Limits::default();
    limits.max_alloc = Some(SAMPLE_MAX_ALLOC);
    let raw = decode_raw(data, limits)?;

    let (width, height) = raw.rgba.dimensions();
    let dimensions = if swaps_axes(raw.orientation) {
        ImageDimensions { width: height, height: width }
    } else {
        ImageDimensions { width, height }
    };

    let full =
        DecodedImage { dimensions: ImageDimensions { width, height }, pixels: raw.rgba.into_raw() };
    let small = downsample(&full, max_edge)?;
    drop(full);
    let sample = RgbaImage::from_raw(small.width(), small.height(), small.pixels)
        .ok_or_else(|| anyhow!("downsampled cover buffer does not match its dimensions"))?;

    Ok((dimensions, finish(sample, raw.orientation, raw.icc_profile.as_deref())))
}

/// Allocation ceiling for covers decoded by [`decode_sample`].
pub const SAMPLE_MAX_ALLOC: u64 = 256 * 1024 * 1024;

struct RawCover {
    rgba: RgbaImage,
    orientation: Orientation,
    icc_profile: Option<Vec<u8>>,
}

fn decode_raw(data: &[u8], limits: Limits) -> Result<RawCover> {
    let mut decoder = decoder_for(data)?;
    decoder.set_limits(limits).context("applying cover decode limits")?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let icc_profile = decoder.icc_profile().unwrap_or(None);

    let image = DynamicImage::from_decoder(decoder).context("decoding cover image")?;
    Ok(RawCover { rgba: image.into_rgba8(), orientation, icc_profile })
}

fn finish(rgba: RgbaImage, orientation: Orientation, icc_profile: Option<&[u8]>) -> DecodedImage {
    let mut rgba = if orientation == Orientation::NoTransforms {
        rgba
    } else {
        let mut image = DynamicImage::ImageRgba8(rgba);
        image.apply_orientation(orientation);
        image.into_rgba8()
    };

    if let Some(profile) = icc_profile {
        if let Err(err) = convert_to_srgb_in_place(&mut rgba, profile) {
            warn!(target: "codec::image", "failed to convert cover ICC profile: {err}");
        }
    }

    let dimensions = ImageDimensions { width: rgba.width(), height: rgba.height() };
    DecodedImage { dimensions, pixels: rgba.into_raw() }
}

fn convert_to_srgb_in_place(image: &mut RgbaImage, profile_bytes: &[u8]) -> Result<()> {
    let source = ColorProfile::new_from_slice(profile_bytes)
        .map_err(|err| anyhow!("invalid ICC profile: {err}"))?;
    let srgb = ColorProfile::new_srgb();
    let raw = image.as_mut();

    let options = TransformOptions::default();
    match source.create_transform_8bit(Layout::Rgba, &srgb, Layout::Rgba, options) {
        Ok(transform) => {
            let mut converted = vec![0u8; raw.len()];
            transform
                .transform(&raw[..], &mut converted)
                .map_err(|err| anyhow!("icc transform failed: {err}"))?;
            raw.copy_from_slice(&converted);
            Ok(())
        }
        // Gray and CMYK-derived profiles only transform three-channel layouts.
        Err(CmsError::InvalidLayout) => {
            let rgb: Vec<u8> = raw.chunks_exact(4).flat_map(|px| px[..3].to_vec()).collect();
            let mut converted = vec![0u8; rgb.len()];
            let transform = source.create_transform_8bit(
                Layout::Rgb,
                &srgb,
                Layout::Rgb,
                TransformOptions::default(),
            )?;
            transform
                .transform(&rgb, &mut converted)
                .map_err(|err| anyhow!("icc transform failed: {err}"))?;
            for (rgba_px, rgb_px) in raw.chunks_exact_mut(4).zip(converted.chunks_exact(3)) {
                rgba_px[..3].copy_from_slice(rgb_px);
            }
            Ok(())
        }
        Err(err) => Err(anyhow!("icc transform setup failed: {err}")),
    }
}
