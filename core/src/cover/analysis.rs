//! Turning encoded cover bytes into dimensions and colors.

use crate::codec;
use crate::types::{CoverColors, ImageDimensions};

use super::Result;
use super::palette;

/// Longest edge of the frame the palette is computed from.
pub const PALETTE_SAMPLE_EDGE: u32 = 96;

/// How much of the cover has to be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Only the header, for the dimensions.
    Bounds,
    /// Decode shrunk to [`PALETTE_SAMPLE_EDGE`] before color extraction.
    Sampled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverAnalysis {
    pub dimensions: ImageDimensions,
    pub colors: Option<CoverColors>,
}

pub fn analyze_cover(bytes: &[u8], mode: DecodeMode) -> Result<CoverAnalysis> {
    match mode {
        DecodeMode::Bounds => {
            Ok(CoverAnalysis { dimensions: codec::read_dimensions(bytes)?, colors: None })
        }
        DecodeMode::Sampled => {
            let (dimensions, sample) = codec::decode_sample(bytes, PALETTE_SAMPLE_EDGE)?;
            Ok(CoverAnalysis { dimensions, colors: palette::extract(&sample) })
        }
    }
}
