//! Cover image decoding and downsampling.

pub mod image;
pub mod resize;

pub use image::{DecodedImage, SAMPLE_MAX_ALLOC, decode_sample, read_dimensions};
pub use resize::downsample;

pub type Result<T> = crate::Result<T>;
