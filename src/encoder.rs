use image::imageops::{self, FilterType};
use image::GrayImage;
use image_hasher::{Hasher, HasherConfig, ImageHash};

use crate::error::{Error, Result};

/// Width of every fingerprint in bits.
pub const HASH_BITS: u32 = 64;

/// Fixed working resolution frames are normalized to before hashing.
/// Changing this (or the hash width) invalidates every stored fingerprint.
const NORMALIZED_SIZE: u32 = 16;

/// A 64-bit perceptual hash of one video frame.
///
/// Persisted as base64 text. A fingerprint whose stored text can no longer
/// be parsed is kept as an invalid fingerprint that is maximally distant
/// from everything, so a single corrupt record degrades one comparison
/// instead of aborting the whole search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    text: String,
    hash: Option<ImageHash>,
}

impl Fingerprint {
    /// Parse a stored base64 fingerprint.
    pub fn try_parse(text: &str) -> Result<Self> {
        match ImageHash::from_base64(text) {
            Ok(hash) => Ok(Self {
                text: text.to_string(),
                hash: Some(hash),
            }),
            Err(_) => Err(Error::HashConversion {
                text: text.to_string(),
            }),
        }
    }

    /// Build a fingerprint from raw hash bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let hash = ImageHash::from_bytes(bytes).map_err(|_| {
            Error::HashConversion {
                text: format!("{:02x?}", bytes),
            }
        })?;
        Ok(Self {
            text: hash.to_base64(),
            hash: Some(hash),
        })
    }

    /// An unparseable fingerprint; compares at maximal distance.
    pub fn invalid(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hash: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.hash.is_some()
    }

    /// The persistable base64 form.
    pub fn to_text(&self) -> &str {
        &self.text
    }

    /// Hamming distance in bits. Either side invalid means maximal distance,
    /// so such a pair can never satisfy a match threshold.
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        match (&self.hash, &other.hash) {
            (Some(a), Some(b)) => a.dist(b),
            _ => u32::MAX,
        }
    }

    fn from_hash(hash: ImageHash) -> Self {
        Self {
            text: hash.to_base64(),
            hash: Some(hash),
        }
    }
}

/// Per-frame perceptual hash encoder.
///
/// Pure and deterministic: identical pixel data always yields an identical
/// fingerprint. The perceptual contract (near-duplicate images hash close
/// under Hamming distance) is delegated to `image_hasher`.
pub struct FingerprintEncoder {
    hasher: Hasher,
}

impl FingerprintEncoder {
    pub fn new() -> Self {
        Self {
            hasher: HasherConfig::new().to_hasher(),
        }
    }

    /// Hash one reduced grayscale frame.
    pub fn encode(&self, image: &GrayImage) -> Fingerprint {
        let normalized = imageops::resize(
            image,
            NORMALIZED_SIZE,
            NORMALIZED_SIZE,
            FilterType::Triangle,
        );
        Fingerprint::from_hash(self.hasher.hash_image(&normalized))
    }
}

impl Default for FingerprintEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn horizontal_ramp(size: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, _y| Luma([(x * 255 / (size - 1)) as u8]))
    }

    fn vertical_ramp(size: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |_x, y| Luma([(y * 255 / (size - 1)) as u8]))
    }

    #[test]
    fn test_encode_is_deterministic() {
        let encoder = FingerprintEncoder::new();
        let image = horizontal_ramp(64);

        assert_eq!(encoder.encode(&image), encoder.encode(&image));
        assert_eq!(encoder.encode(&image).distance(&encoder.encode(&image)), 0);
    }

    #[test]
    fn test_distinct_images_hash_far_apart() {
        let encoder = FingerprintEncoder::new();
        let horizontal = encoder.encode(&horizontal_ramp(64));
        let vertical = encoder.encode(&vertical_ramp(64));

        assert!(horizontal.distance(&vertical) > 3);
    }

    #[test]
    fn test_base64_round_trip() {
        let encoder = FingerprintEncoder::new();
        let fingerprint = encoder.encode(&horizontal_ramp(32));

        let reparsed = Fingerprint::try_parse(fingerprint.to_text()).unwrap();
        assert_eq!(fingerprint, reparsed);
        assert_eq!(fingerprint.distance(&reparsed), 0);
    }

    #[test]
    fn test_invalid_text_is_rejected_and_never_matches() {
        assert!(Fingerprint::try_parse("not a fingerprint!!").is_err());

        let invalid = Fingerprint::invalid("not a fingerprint!!");
        let valid = Fingerprint::from_bytes(&[0u8; 8]).unwrap();
        assert!(!invalid.is_valid());
        assert_eq!(invalid.distance(&valid), u32::MAX);
        assert_eq!(invalid.distance(&invalid), u32::MAX);
    }

    #[test]
    fn test_from_bytes_distance() {
        let zeros = Fingerprint::from_bytes(&[0u8; 8]).unwrap();
        let ones = Fingerprint::from_bytes(&[0xFFu8; 8]).unwrap();

        assert_eq!(zeros.distance(&zeros), 0);
        assert_eq!(zeros.distance(&ones), HASH_BITS);
    }
}
