//! Derived cover attributes: aspect ratio and palette colors.

pub mod analysis;
pub mod metadata;
pub mod palette;

pub use analysis::{CoverAnalysis, DecodeMode, PALETTE_SAMPLE_EDGE, analyze_cover};
pub use metadata::{
    COVER_COLORS_KEY, COVER_RATIOS_KEY, CoverMetadataCache, CoverMetadataEntry, CoverOutcome,
    CoverRequest, LoadSummary,
};

pub type Result<T> = crate::Result<T>;
