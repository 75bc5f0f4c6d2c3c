//! Fused similarity scoring between two fingerprints.
//!
//! The perceptual hash carries most of the discriminative signal; the
//! region profile is a secondary illumination/texture cue; the exact
//! content-hash boost rewards literal duplicates over near-duplicates.

use crate::types::{Fingerprint, PHASH_BITS};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("incompatible fingerprint: phash lengths {0} and {1}, expected {PHASH_BITS}")]
    IncompatibleFingerprint(usize, usize),
}

/// Fusion weights. Defaults match the deployed tuning.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub phash: f32,
    pub region: f32,
    pub exact_boost: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            phash: 0.8,
            region: 0.2,
            exact_boost: 0.2,
        }
    }
}

/// Per-component breakdown of one comparison.
#[derive(Debug, Clone, Copy)]
pub struct Score {
    pub phash_sim: f32,
    pub region_sim: f32,
    pub exact: bool,
    /// Weighted fusion. Deliberately unclamped: a byte-identical pair
    /// scores above 1.0 (1.2 at default weights), keeping duplicates
    /// distinguishable from merely similar images in the output.
    pub combined: f32,
}

/// Count of differing bit positions between two equal-length bit strings.
pub fn hamming(a: &str, b: &str) -> Result<u32, ScoreError> {
    if a.len() != b.len() {
        return Err(ScoreError::IncompatibleFingerprint(a.len(), b.len()));
    }
    Ok(a.chars().zip(b.chars()).filter(|(x, y)| x != y).count() as u32)
}

/// Score `candidate` against `query`.
///
/// A hash of the wrong width fails with `IncompatibleFingerprint` so the
/// scan upstream can skip the candidate; a region profile of the wrong
/// length is merely a worst-case contribution (`region_sim = 0`).
pub fn score(
    query: &Fingerprint,
    candidate: &Fingerprint,
    weights: &ScoreWeights,
) -> Result<Score, ScoreError> {
    if query.phash.len() != PHASH_BITS || candidate.phash.len() != PHASH_BITS {
        return Err(ScoreError::IncompatibleFingerprint(
            query.phash.len(),
            candidate.phash.len(),
        ));
    }

    let distance = hamming(&query.phash, &candidate.phash)?;
    let phash_sim = 1.0 - distance as f32 / PHASH_BITS as f32;
    let region_sim = region_similarity(&query.region_profile, &candidate.region_profile);
    let exact = query.content_hash == candidate.content_hash;

    let combined = weights.phash * phash_sim
        + weights.region * region_sim
        + if exact { weights.exact_boost } else { 0.0 };

    Ok(Score {
        phash_sim,
        region_sim,
        exact,
        combined,
    })
}

/// Euclidean distance over the profiles, normalized by the maximum
/// possible distance for 8-bit samples (`sqrt(N · 255²)`).
fn region_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let distance = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt();
    let max_distance = (a.len() as f32).sqrt() * 255.0;
    1.0 - distance / max_distance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{Fingerprinter, PixelFingerprinter};
    use image::{DynamicImage, GrayImage, Luma};
    use std::io::Cursor;

    fn fp(phash: &str, profile: &[f32], content: &str) -> Fingerprint {
        Fingerprint {
            content_hash: content.to_string(),
            phash: phash.to_string(),
            region_profile: profile.to_vec(),
            thumbnail: Vec::new(),
        }
    }

    #[test]
    fn test_hamming_symmetric_and_zero_on_self() {
        let a = "0110".repeat(16);
        let b = "1010".repeat(16);
        assert_eq!(hamming(&a, &b).unwrap(), hamming(&b, &a).unwrap());
        assert_eq!(hamming(&a, &a).unwrap(), 0);
        assert_eq!(hamming(&a, &b).unwrap(), 32);
    }

    #[test]
    fn test_hamming_rejects_length_mismatch() {
        assert!(matches!(
            hamming("0101", "010").unwrap_err(),
            ScoreError::IncompatibleFingerprint(4, 3)
        ));
    }

    #[test]
    fn test_self_score_is_one_point_two() {
        let a = fp(&"01".repeat(32), &[10.0; 16], "deadbeef");
        let s = score(&a, &a, &ScoreWeights::default()).unwrap();
        assert!((s.phash_sim - 1.0).abs() < 1e-6);
        assert!((s.region_sim - 1.0).abs() < 1e-6);
        assert!(s.exact);
        // Unclamped by design: self plus the duplicate boost.
        assert!((s.combined - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_wrong_hash_width_is_incompatible() {
        let good = fp(&"0".repeat(64), &[0.0; 16], "a");
        let legacy = fp("d41d8cd98f00b204e9800998ecf8427e", &[0.0; 16], "b");
        assert!(score(&good, &legacy, &ScoreWeights::default()).is_err());
        assert!(score(&legacy, &good, &ScoreWeights::default()).is_err());
    }

    #[test]
    fn test_mismatched_profile_lengths_score_zero_region() {
        let a = fp(&"0".repeat(64), &[10.0; 16], "a");
        let b = fp(&"0".repeat(64), &[10.0; 9], "b");
        let s = score(&a, &b, &ScoreWeights::default()).unwrap();
        assert_eq!(s.region_sim, 0.0);
        assert!((s.combined - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_opposite_profiles_score_zero_region() {
        let a = fp(&"0".repeat(64), &[0.0; 16], "a");
        let b = fp(&"0".repeat(64), &[255.0; 16], "b");
        let s = score(&a, &b, &ScoreWeights::default()).unwrap();
        assert!(s.region_sim.abs() < 1e-6);
    }

    #[test]
    fn test_weights_are_configuration() {
        let a = fp(&"1".repeat(64), &[100.0; 16], "a");
        let b = fp(&"1".repeat(64), &[100.0; 16], "b");
        let weights = ScoreWeights {
            phash: 0.5,
            region: 0.5,
            exact_boost: 0.0,
        };
        let s = score(&a, &b, &weights).unwrap();
        assert!((s.combined - 1.0).abs() < 1e-6);
    }

    fn png_bytes(img: GrayImage) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_duplicate_outscores_near_duplicate() {
        // Byte-identical sources must beat visually-similar-but-byte-
        // different ones, all else being equal. One flipped pixel keeps
        // the images visually interchangeable but changes the bytes.
        let original = png_bytes(GrayImage::from_pixel(64, 64, Luma([40])));
        let mut tweaked_img = GrayImage::from_pixel(64, 64, Luma([40]));
        tweaked_img.put_pixel(0, 0, Luma([41]));
        let tweaked = png_bytes(tweaked_img);

        let extractor = PixelFingerprinter::default();
        let base = extractor.extract(&original).unwrap();
        let duplicate = extractor.extract(&original).unwrap();
        let near = extractor.extract(&tweaked).unwrap();

        let weights = ScoreWeights::default();
        let dup_score = score(&base, &duplicate, &weights).unwrap();
        let near_score = score(&base, &near, &weights).unwrap();
        assert!(dup_score.exact);
        assert!(!near_score.exact);
        assert!(dup_score.combined > near_score.combined);
    }
}
