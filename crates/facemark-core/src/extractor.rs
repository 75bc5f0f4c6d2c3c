//! Fingerprint extraction — raw image bytes in, [`Fingerprint`] out.
//!
//! The default [`PixelFingerprinter`] works in the pixel domain:
//! decode → luminance → resize → blur → mean-threshold hash. The
//! [`ChunkFingerprinter`] approximates the same shape from raw byte
//! windows without decoding, for inputs that never were images.

use crate::types::{Fingerprint, PHASH_BITS};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unreadable image: {0}")]
    UnreadableImage(String),
}

/// Extraction strategy. One method, deterministic, no side effects.
///
/// Scoring and selection only see [`Fingerprint`]s, so a strategy can be
/// swapped (e.g. for a learned embedding) without touching either.
pub trait Fingerprinter {
    fn extract(&self, bytes: &[u8]) -> Result<Fingerprint, ExtractError>;
}

/// Tunables for pixel-domain extraction. Defaults reproduce the
/// deployed constants; all comparisons assume the grids match across
/// every fingerprint in a deployment.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Side length of the square analysis image (scale/aspect normalization).
    pub analysis_size: u32,
    /// Gaussian blur sigma applied before hashing (sensor-noise suppression).
    pub blur_sigma: f32,
    /// Hash grid side; 8 gives the 64-bit hash.
    pub hash_grid: u32,
    /// Region-profile grid side; 4 gives 16 regions.
    pub region_grid: u32,
    /// Side length of the display thumbnail.
    pub thumbnail_size: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            analysis_size: 100,
            blur_sigma: 2.0,
            hash_grid: 8,
            region_grid: 4,
            thumbnail_size: 32,
        }
    }
}

/// Pixel-domain perceptual fingerprinter.
pub struct PixelFingerprinter {
    config: ExtractorConfig,
}

impl PixelFingerprinter {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }
}

impl Default for PixelFingerprinter {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl Fingerprinter for PixelFingerprinter {
    fn extract(&self, bytes: &[u8]) -> Result<Fingerprint, ExtractError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| ExtractError::UnreadableImage(e.to_string()))?;
        let gray = decoded.to_luma8();
        if gray.width() == 0 || gray.height() == 0 {
            return Err(ExtractError::UnreadableImage("zero-area image".into()));
        }

        // Normalize scale and aspect, then low-pass before any sampling.
        let normalized = imageops::resize(
            &gray,
            self.config.analysis_size,
            self.config.analysis_size,
            FilterType::Triangle,
        );
        let blurred = imageops::blur(&normalized, self.config.blur_sigma);

        let phash = perceptual_hash(&blurred, self.config.hash_grid);
        let region_profile = region_means(&blurred, self.config.region_grid);
        let thumbnail = encode_thumbnail(&gray, self.config.thumbnail_size)?;

        Ok(Fingerprint {
            content_hash: hex::encode(Sha256::digest(bytes)),
            phash,
            region_profile,
            thumbnail,
        })
    }
}

/// Downsample to `grid`×`grid`, then threshold each sample against the
/// image's own mean. Using the mean (not a fixed constant) keeps the
/// hash stable under brightness shifts while staying sensitive to edges.
fn perceptual_hash(img: &GrayImage, grid: u32) -> String {
    let small = imageops::resize(img, grid, grid, FilterType::Lanczos3);
    let samples: Vec<f32> = small.pixels().map(|p| p.0[0] as f32).collect();
    let mean = samples.iter().sum::<f32>() / samples.len() as f32;
    samples
        .iter()
        .map(|&s| if s > mean { '1' } else { '0' })
        .collect()
}

/// Mean intensity per cell of a `grid`×`grid` partition, row-major.
fn region_means(img: &GrayImage, grid: u32) -> Vec<f32> {
    let (w, h) = img.dimensions();
    let mut profile = Vec::with_capacity((grid * grid) as usize);
    for gy in 0..grid {
        for gx in 0..grid {
            let (x0, x1) = (gx * w / grid, (gx + 1) * w / grid);
            let (y0, y1) = (gy * h / grid, (gy + 1) * h / grid);
            let mut sum = 0.0f64;
            let mut count = 0u32;
            for y in y0..y1 {
                for x in x0..x1 {
                    sum += f64::from(img.get_pixel(x, y).0[0]);
                    count += 1;
                }
            }
            profile.push(if count == 0 {
                0.0
            } else {
                (sum / f64::from(count)) as f32
            });
        }
    }
    profile
}

fn encode_thumbnail(gray: &GrayImage, size: u32) -> Result<Vec<u8>, ExtractError> {
    let small = imageops::resize(gray, size, size, FilterType::Triangle);
    let mut out = Vec::new();
    DynamicImage::ImageLuma8(small)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .map_err(|e| ExtractError::UnreadableImage(format!("thumbnail re-encode: {e}")))?;
    Ok(out)
}

/// Byte-chunk approximation: derives the hash from fixed windows of the
/// raw bytes, never decoding pixels. Cheaper and format-agnostic, but
/// sensitive to re-encoding; produces no thumbnail.
pub struct ChunkFingerprinter {
    /// Number of windows feeding the region profile.
    pub region_windows: usize,
}

impl Default for ChunkFingerprinter {
    fn default() -> Self {
        Self { region_windows: 16 }
    }
}

impl Fingerprinter for ChunkFingerprinter {
    fn extract(&self, bytes: &[u8]) -> Result<Fingerprint, ExtractError> {
        if bytes.is_empty() {
            return Err(ExtractError::UnreadableImage("empty input".into()));
        }

        let samples = window_digests(bytes, PHASH_BITS);
        let mean = samples.iter().map(|&s| f32::from(s)).sum::<f32>() / samples.len() as f32;
        let phash = samples
            .iter()
            .map(|&s| if f32::from(s) > mean { '1' } else { '0' })
            .collect();

        let region_profile = window_means(bytes, self.region_windows);

        Ok(Fingerprint {
            content_hash: hex::encode(Sha256::digest(bytes)),
            phash,
            region_profile,
            thumbnail: Vec::new(),
        })
    }
}

/// First digest byte of each of `n` near-equal windows. The digest
/// spreads small byte differences across the sample range.
fn window_digests(bytes: &[u8], n: usize) -> Vec<u8> {
    windows(bytes, n)
        .map(|w| Sha256::digest(w)[0])
        .collect()
}

/// Mean byte value of each of `n` near-equal windows.
fn window_means(bytes: &[u8], n: usize) -> Vec<f32> {
    windows(bytes, n)
        .map(|w| w.iter().map(|&b| f64::from(b)).sum::<f64>() as f32 / w.len() as f32)
        .collect()
}

/// Split non-empty `bytes` into exactly `n` contiguous, non-empty
/// windows of near-equal length. Inputs shorter than `n` yield
/// overlapping single-byte windows.
fn windows(bytes: &[u8], n: usize) -> impl Iterator<Item = &[u8]> {
    let len = bytes.len();
    (0..n).map(move |i| {
        let start = i * len / n;
        let end = ((i + 1) * len / n).clamp(start + 1, len);
        &bytes[start..end]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn png_bytes(img: GrayImage) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn solid(size: u32, value: u8) -> Vec<u8> {
        png_bytes(GrayImage::from_pixel(size, size, Luma([value])))
    }

    fn checkerboard(size: u32, square: u32) -> Vec<u8> {
        png_bytes(GrayImage::from_fn(size, size, |x, y| {
            if ((x / square) + (y / square)) % 2 == 0 {
                Luma([0])
            } else {
                Luma([255])
            }
        }))
    }

    #[test]
    fn test_extract_is_deterministic() {
        let bytes = checkerboard(128, 16);
        let fp = PixelFingerprinter::default();
        assert_eq!(fp.extract(&bytes).unwrap(), fp.extract(&bytes).unwrap());
    }

    #[test]
    fn test_fingerprint_shape() {
        let fp = PixelFingerprinter::default()
            .extract(&solid(64, 200))
            .unwrap();
        assert_eq!(fp.phash.len(), PHASH_BITS);
        assert!(fp.phash.chars().all(|c| c == '0' || c == '1'));
        assert_eq!(fp.region_profile.len(), 16);
        assert_eq!(fp.content_hash.len(), 64);
        assert!(!fp.thumbnail.is_empty());
    }

    #[test]
    fn test_garbage_bytes_are_unreadable() {
        let err = PixelFingerprinter::default()
            .extract(b"definitely not an image")
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnreadableImage(_)));
    }

    #[test]
    fn test_flat_image_hashes_to_zero() {
        // Every sample equals the mean, and the threshold is strict.
        let fp = PixelFingerprinter::default()
            .extract(&solid(64, 0))
            .unwrap();
        assert_eq!(fp.phash, "0".repeat(PHASH_BITS));
        assert!(fp.region_profile.iter().all(|&v| v < 1.0));
    }

    #[test]
    fn test_structured_image_hashes_mixed() {
        let fp = PixelFingerprinter::default()
            .extract(&checkerboard(128, 32))
            .unwrap();
        assert!(fp.phash.contains('0'));
        assert!(fp.phash.contains('1'));
    }

    #[test]
    fn test_brightness_shift_keeps_hash_close() {
        // Mean thresholding should make a uniform +40 shift near-invisible.
        let dark = png_bytes(GrayImage::from_fn(96, 96, |x, _| Luma([(x * 2) as u8])));
        let bright = png_bytes(GrayImage::from_fn(96, 96, |x, _| Luma([(x * 2 + 40) as u8])));
        let extractor = PixelFingerprinter::default();
        let a = extractor.extract(&dark).unwrap();
        let b = extractor.extract(&bright).unwrap();
        let differing = a
            .phash
            .chars()
            .zip(b.phash.chars())
            .filter(|(x, y)| x != y)
            .count();
        assert!(differing <= 8, "hashes diverged by {differing} bits");
    }

    #[test]
    fn test_region_profile_is_row_major() {
        // Left half black, right half white: within each profile row the
        // first two regions are darker than the last two.
        let half = png_bytes(GrayImage::from_fn(100, 100, |x, _| {
            if x < 50 {
                Luma([0])
            } else {
                Luma([255])
            }
        }));
        let fp = PixelFingerprinter::default().extract(&half).unwrap();
        for row in fp.region_profile.chunks(4) {
            assert!(row[0] < row[3]);
            assert!(row[1] < row[2]);
        }
    }

    #[test]
    fn test_chunk_strategy_shape_and_determinism() {
        let bytes: Vec<u8> = (0u32..4096).map(|i| (i % 251) as u8).collect();
        let extractor = ChunkFingerprinter::default();
        let fp = extractor.extract(&bytes).unwrap();
        assert_eq!(fp.phash.len(), PHASH_BITS);
        assert_eq!(fp.region_profile.len(), 16);
        assert!(fp.thumbnail.is_empty());
        assert_eq!(fp, extractor.extract(&bytes).unwrap());
    }

    #[test]
    fn test_chunk_strategy_rejects_empty_input() {
        let err = ChunkFingerprinter::default().extract(&[]).unwrap_err();
        assert!(matches!(err, ExtractError::UnreadableImage(_)));
    }

    #[test]
    fn test_chunk_strategy_handles_tiny_input() {
        // Fewer bytes than windows: windows repeat, shape is unchanged.
        let fp = ChunkFingerprinter::default().extract(&[1, 2, 3]).unwrap();
        assert_eq!(fp.phash.len(), PHASH_BITS);
        assert_eq!(fp.region_profile.len(), 16);
    }
}
