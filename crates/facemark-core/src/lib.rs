//! facemark-core — perceptual image fingerprinting and similarity matching.
//!
//! Three pure, synchronous stages: extraction (bytes → [`Fingerprint`]),
//! scoring (fingerprint pair → fused similarity), and selection (query ×
//! candidate set → match decision with diagnostics). No persistence,
//! networking, or rendering lives here; callers hand in immutable
//! snapshots and interpret the decision.

pub mod extractor;
pub mod matcher;
pub mod scorer;
pub mod types;

pub use extractor::{
    ChunkFingerprinter, ExtractError, ExtractorConfig, Fingerprinter, PixelFingerprinter,
};
pub use matcher::{select_best, Decision, Selection};
pub use scorer::{hamming, score, Score, ScoreError, ScoreWeights};
pub use types::{Candidate, Fingerprint, PHASH_BITS};
