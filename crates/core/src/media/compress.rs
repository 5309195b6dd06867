use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};

use super::MediaError;

/// Quality used when re-encoding non-JPEG input.
pub const NORMALIZE_QUALITY: u8 = 90;
/// First quality tried when compressing.
pub const INITIAL_QUALITY: u8 = 80;
/// Compression never goes below this quality.
pub const MIN_QUALITY: u8 = 10;
/// Room left under the target for the EXIF block added afterwards.
pub const METADATA_RESERVE_BYTES: usize = 50 * 1024;

/// Size the final file should fit into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionTarget {
    pub target_bytes: usize,
    pub reserve_bytes: usize,
}

impl CompressionTarget {
    /// Budget used by the page image form.
    pub const PAGE_IMAGE: CompressionTarget = CompressionTarget::new(100 * 1024);
    /// Budget used by the media library upload.
    pub const LIBRARY: CompressionTarget = CompressionTarget::new(500 * 1024);

    pub const fn new(target_bytes: usize) -> Self {
        Self {
            target_bytes,
            reserve_bytes: METADATA_RESERVE_BYTES,
        }
    }

    /// Bytes available for the compressed image itself.
    pub fn budget(&self) -> usize {
        self.target_bytes.saturating_sub(self.reserve_bytes)
    }
}

impl Default for CompressionTarget {
    fn default() -> Self {
        Self::PAGE_IMAGE
    }
}

/// Output of [`compress`].
#[derive(Debug, Clone)]
pub struct Compressed {
    pub bytes: Vec<u8>,
    /// Quality (percent) of the final encode.
    pub quality: u8,
    /// Qualities tried, in order.
    pub attempts: Vec<u8>,
}

/// Next quality to try after an encode of `size` bytes, or `None` when the
/// result fits or the floor was reached. Steps down by 20 when the result is
/// more than twice the budget, else by 10.
pub fn next_quality(quality: u8, size: usize, budget: usize) -> Option<u8> {
    if size <= budget || quality <= MIN_QUALITY {
        return None;
    }
    let overage = if budget == 0 {
        f64::INFINITY
    } else {
        size as f64 / budget as f64
    };
    let step = if overage > 2.0 { 20 } else { 10 };
    Some(quality.saturating_sub(step).max(MIN_QUALITY))
}

pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, MediaError> {
    let rgb = image.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(&rgb)
        .map_err(MediaError::Encode)?;
    Ok(out)
}

/// JPEG input passes through untouched; anything else is decoded and
/// re-encoded as JPEG.
pub fn normalize_to_jpeg(bytes: &[u8]) -> Result<Vec<u8>, MediaError> {
    if matches!(image::guess_format(bytes), Ok(ImageFormat::Jpeg)) {
        return Ok(bytes.to_vec());
    }
    let decoded = image::load_from_memory(bytes).map_err(MediaError::Decode)?;
    encode_jpeg(&decoded, NORMALIZE_QUALITY)
}

/// Re-encode at decreasing quality until the result fits the budget or the
/// quality floor is reached.
pub fn compress(jpeg: &[u8], target: CompressionTarget) -> Result<Compressed, MediaError> {
    let decoded = image::load_from_memory(jpeg).map_err(MediaError::Decode)?;
    let budget = target.budget();

    let mut quality = INITIAL_QUALITY;
    let mut attempts = Vec::new();
    loop {
        let bytes = encode_jpeg(&decoded, quality)?;
        attempts.push(quality);
        match next_quality(quality, bytes.len(), budget) {
            Some(next) => {
                tracing::debug!(quality, size = bytes.len(), budget, next, "image over budget");
                quality = next;
            }
            None => {
                return Ok(Compressed {
                    bytes,
                    quality,
                    attempts,
                })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;

    /// Deterministic noisy image; noise keeps JPEG from compressing it away.
    pub(crate) fn noisy_image(width: u32, height: u32) -> DynamicImage {
        let mut seed: u32 = 0x2545_F491;
        let buf = ImageBuffer::from_fn(width, height, |_, _| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let [r, g, b, _] = seed.to_le_bytes();
            Rgb([r, g, b])
        });
        DynamicImage::ImageRgb8(buf)
    }

    pub(crate) fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn quality_steps() {
        // Fits: stop.
        assert_eq!(next_quality(80, 1000, 1000), None);
        // More than 2x over: big step.
        assert_eq!(next_quality(80, 2001, 1000), Some(60));
        // Exactly 2x over: small step.
        assert_eq!(next_quality(80, 2000, 1000), Some(70));
        // Floor.
        assert_eq!(next_quality(20, 5000, 1000), Some(10));
        assert_eq!(next_quality(10, 5000, 1000), None);
    }

    #[test]
    fn budget_subtracts_reserve() {
        assert_eq!(CompressionTarget::PAGE_IMAGE.budget(), 50 * 1024);
        assert_eq!(CompressionTarget::LIBRARY.budget(), 450 * 1024);
        assert_eq!(CompressionTarget::new(10).budget(), 0);
    }

    #[test]
    fn png_is_normalized_to_jpeg() {
        let png = png_bytes(&noisy_image(32, 32));
        let jpeg = normalize_to_jpeg(&png).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn jpeg_passes_through_unchanged() {
        let jpeg = encode_jpeg(&noisy_image(16, 16), 75).unwrap();
        assert_eq!(normalize_to_jpeg(&jpeg).unwrap(), jpeg);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(normalize_to_jpeg(b"not an image"), Err(MediaError::Decode(_))));
    }

    #[test]
    fn compression_meets_budget_or_hits_floor() {
        let jpeg = encode_jpeg(&noisy_image(256, 256), 95).unwrap();
        for target in [CompressionTarget::new(60 * 1024), CompressionTarget::new(51 * 1024)] {
            let out = compress(&jpeg, target).unwrap();
            assert!(out.bytes.len() <= target.budget() || out.quality == MIN_QUALITY);
            assert_eq!(out.attempts[0], INITIAL_QUALITY);
            assert!(out.attempts.windows(2).all(|w| w[1] < w[0]));
            assert_eq!(*out.attempts.last().unwrap(), out.quality);
        }
    }

    #[test]
    fn small_image_stops_at_initial_quality() {
        let jpeg = encode_jpeg(&noisy_image(8, 8), 95).unwrap();
        let out = compress(&jpeg, CompressionTarget::LIBRARY).unwrap();
        assert_eq!(out.attempts, vec![INITIAL_QUALITY]);
    }
}
