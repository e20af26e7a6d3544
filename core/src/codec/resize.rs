//! Downsampling decoded covers before palette extraction, built on `fast_image_resize`.

use anyhow::{anyhow, ensure};
use fast_image_resize as fir;

use crate::types::ImageDimensions;

use super::Result;
use super::image::DecodedImage;

/// Target dimensions that fit within `max_edge` on both axes, keeping the aspect ratio.
pub fn fit_within(source: ImageDimensions, max_edge: u32) -> ImageDimensions {
    let longest = source.width.max(source.height);
    if longest <= max_edge || max_edge == 0 {
        return source;
    }
    let scale = max_edge as f64 / longest as f64;
    ImageDimensions {
        width: ((source.width as f64 * scale).round() as u32).max(1),
        height: ((source.height as f64 * scale).round() as u32).max(1),
    }
}

/// Shrink an RGBA frame so its longest edge is at most `max_edge`, area-averaging pixels.
///
/// Frames already within bounds are returned unchanged.
pub fn downsample(source: &DecodedImage, max_edge: u32) -> Result<DecodedImage> {
    let (width, height) = (source.width(), source.height());
    ensure!(width > 0 && height > 0, "source image has zero dimensions");
    ensure!(
        source.pixels().len() >= width as usize * height as usize * 4,
        "source buffer is smaller than expected"
    );

    let target = fit_within(source.dimensions, max_edge);
    if target == source.dimensions {
        return Ok(source.clone());
    }

    let src_view = fir::images::ImageRef::new(width, height, source.pixels(), fir::PixelType::U8x4)
        .map_err(|err| anyhow!("failed to prepare source image: {err}"))?;
    let mut dst_image = fir::images::Image::new(target.width, target.height, fir::PixelType::U8x4);

    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Box))
        .use_alpha(true);
    fir::Resizer::new()
        .resize(&src_view, &mut dst_image, Some(&options))
        .map_err(|err| anyhow!("fast image resize failed: {err}"))?;

    Ok(DecodedImage { dimensions: target, pixels: dst_image.into_vec() })
}
