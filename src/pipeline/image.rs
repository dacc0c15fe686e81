//! Upload preparation: decode, downscale and re-encode a photo as a
//! base64 JPEG small enough for an inline generation request.

use std::io::Cursor;

use base64::Engine as _;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use thiserror::Error;

use super::analysis::InlineImage;

/// Upload size limit (10 MB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Longest side of the encoded image, in pixels.
pub const MAX_DIMENSION: u32 = 512;
/// Encoded JPEG size target (800 KB).
pub const TARGET_ENCODED_BYTES: usize = 800 * 1024;

const INITIAL_QUALITY: u8 = 85;
const QUALITY_STEP: u8 = 10;
const MIN_QUALITY: u8 = 30;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Image upload is empty")]
    Empty,

    #[error("Image exceeds {}MB limit", MAX_UPLOAD_BYTES / (1024 * 1024))]
    TooLarge,

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("JPEG encoding failed: {0}")]
    Encode(String),
}

/// Reject empty and oversized uploads before decoding.
pub fn validate_upload(bytes: &[u8]) -> Result<(), ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ImageError::TooLarge);
    }
    Ok(())
}

/// Prepare uploaded bytes for the analysis call.
pub fn prepare_image(bytes: &[u8]) -> Result<InlineImage, ImageError> {
    validate_upload(bytes)?;

    let img = image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
    let (orig_w, orig_h) = img.dimensions();

    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let resized = downscale(rgb, MAX_DIMENSION);

    let (jpeg, quality) = encode_jpeg_within(&resized, TARGET_ENCODED_BYTES)?;

    tracing::debug!(
        original = format!("{orig_w}x{orig_h}"),
        output = format!("{}x{}", resized.width(), resized.height()),
        quality,
        jpeg_size = jpeg.len(),
        "Image prepared for analysis"
    );

    Ok(InlineImage::jpeg(
        base64::engine::general_purpose::STANDARD.encode(jpeg),
    ))
}

/// Fit the image within `max_dim` on its longest side, keeping aspect ratio.
/// Smaller images are returned untouched.
fn downscale(img: DynamicImage, max_dim: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w.max(h) <= max_dim {
        return img;
    }
    img.resize(max_dim, max_dim, FilterType::Lanczos3)
}

/// Encode as JPEG, lowering quality until the output fits `limit` or the
/// quality floor is reached. Returns the bytes and the quality used.
fn encode_jpeg_within(img: &DynamicImage, limit: usize) -> Result<(Vec<u8>, u8), ImageError> {
    let mut quality = INITIAL_QUALITY;
    loop {
        let bytes = encode_jpeg(img, quality)?;
        if bytes.len() <= limit || quality <= MIN_QUALITY {
            return Ok((bytes, quality));
        }
        quality = quality.saturating_sub(QUALITY_STEP).max(MIN_QUALITY);
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageOutputFormat::Jpeg(quality))
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(cursor.into_inner())
}
