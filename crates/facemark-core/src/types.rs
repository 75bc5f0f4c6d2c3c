use serde::{Deserialize, Serialize};

/// Perceptual hash width in bits. Every comparable fingerprint carries
/// exactly this many bits; anything else is a legacy record and is
/// rejected at comparison time, not at load time.
pub const PHASH_BITS: usize = 64;

/// Derived, comparable signature of one image.
///
/// Immutable after extraction. The thumbnail is display-only payload and
/// must never participate in similarity scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Hex SHA-256 of the raw input bytes. Equality means the source
    /// images were byte-identical.
    pub content_hash: String,
    /// 64-character bit string ('0'/'1') capturing coarse visual structure.
    ///
    /// Kept as a string rather than a `u64`: fingerprints round-trip
    /// through the JSON enrollment store, where records written by the
    /// old raw-hash strategy carry hashes of other lengths.
    pub phash: String,
    /// Row-major mean intensities (0.0–255.0) over a fixed spatial grid,
    /// 4×4 by default. The grid size is fixed per deployment.
    pub region_profile: Vec<f32>,
    /// Small re-encoded PNG for display. Base64 in JSON.
    #[serde(with = "base64_blob", default, skip_serializing_if = "Vec::is_empty")]
    pub thumbnail: Vec<u8>,
}

/// An enrolled identity's fingerprint, as handed to the match scan.
/// The core never mutates a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub identity: String,
    pub fingerprint: Fingerprint,
}

mod base64_blob {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(de)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
