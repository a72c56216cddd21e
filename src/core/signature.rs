use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};
use image_hasher::{HashAlg, Hasher, HasherConfig};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::core::format::{self, FileKind};
use crate::core::raster;

/// Every raster is normalized to this square canvas before feature
/// computation, so hashes and color statistics are comparable regardless of
/// source resolution or color mode.
pub const CANVAS_DIM: u32 = 64;

/// Bit length of the perceptual and average hashes.
pub const HASH_BITS: u32 = 64;

/// Content-hash sentinel for files that could not be read at all.
/// Two signatures carrying this sentinel are never exact duplicates.
pub const CONTENT_HASH_ERROR: &str = "error";

const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// The per-file feature record all comparisons run against. Immutable once
/// computed; every field has a safe default, so extraction failures degrade
/// fields instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSignature {
    /// Corpus-relative path, unique within the corpus.
    pub filename: String,
    /// SHA-256 hex digest of the raw file bytes, or [`CONTENT_HASH_ERROR`].
    pub content_hash: String,
    /// Sniffed encoding kind, independent of the extension.
    pub detected_kind: FileKind,
    /// Lowercase nominal extension, without the dot. May be empty.
    pub extension: String,
    /// True when the detected kind or the extension indicates vector markup.
    pub is_vector: bool,
    pub width: u32,
    pub height: u32,
    /// width / max(height, 1); always defined.
    pub aspect_ratio: f64,
    /// 64-bit DCT perceptual hash over the normalized canvas, hex-encoded.
    /// `None` means the signal is unavailable, distinct from a real all-zero
    /// hash of a uniform image.
    pub phash: Option<String>,
    /// 64-bit mean hash over the normalized canvas, hex-encoded.
    pub ahash: Option<String>,
    /// Per-channel mean of the normalized canvas.
    pub avg_color: [u8; 3],
    /// Mean luma over the normalized canvas.
    pub brightness: f64,
    /// Standard deviation of luma over the normalized canvas.
    pub contrast: f64,
}

impl ImageSignature {
    /// The fully-degraded signature for a file that could not be read.
    /// Still comparable through the color/brightness/aspect signals.
    pub fn failed(filename: &str, extension: &str) -> Self {
        Self {
            filename: filename.to_string(),
            content_hash: CONTENT_HASH_ERROR.to_string(),
            detected_kind: FileKind::Error,
            extension: extension.to_string(),
            is_vector: extension == "svg",
            width: CANVAS_DIM,
            height: CANVAS_DIM,
            aspect_ratio: 1.0,
            phash: None,
            ahash: None,
            avg_color: [128, 128, 128],
            brightness: 128.0,
            contrast: 0.0,
        }
    }

    /// Whether the content hash is a real digest rather than the sentinel.
    pub fn has_valid_hash(&self) -> bool {
        self.content_hash != CONTENT_HASH_ERROR
    }
}

/// Computes [`ImageSignature`]s. One instance is shared across worker
/// threads; the hashers are configured once and reused per image.
pub struct SignatureExtractor {
    phasher: Hasher,
    ahasher: Hasher,
}

impl SignatureExtractor {
    pub fn new() -> Self {
        Self {
            phasher: HasherConfig::new()
                .hash_alg(HashAlg::Mean)
                .preproc_dct()
                .hash_size(8, 8)
                .to_hasher(),
            ahasher: HasherConfig::new()
                .hash_alg(HashAlg::Mean)
                .hash_size(8, 8)
                .to_hasher(),
        }
    }

    /// Extract the signature for one corpus file. Never fails: an unreadable
    /// file yields the degraded signature with the error content hash.
    pub fn extract_path(&self, root: &Path, filename: &str) -> ImageSignature {
        let extension = format::extension_of(filename);
        match fs::read(root.join(filename)) {
            Ok(bytes) => self.extract_bytes(filename, &extension, &bytes),
            Err(e) => {
                warn!(file = filename, error = %e, "unreadable file, signature degraded");
                ImageSignature::failed(filename, &extension)
            }
        }
    }

    /// Extract a signature from in-memory bytes.
    ///
    /// The content hash covers the raw original bytes, not the normalized
    /// raster: exact-duplicate detection must be insensitive to decoding but
    /// sensitive to byte-identical sources.
    pub fn extract_bytes(&self, filename: &str, extension: &str, bytes: &[u8]) -> ImageSignature {
        let mut sha = Sha256::new();
        sha.update(bytes);
        let content_hash = format!("{:x}", sha.finalize());

        let detected_kind = format::sniff_bytes(bytes, extension);
        let is_vector = detected_kind == FileKind::Svg || extension == "svg";

        let decoded = raster::load_raster(filename, bytes, is_vector);
        let (width, height) = (decoded.width(), decoded.height());
        let aspect_ratio = width as f64 / height.max(1) as f64;

        let normalized = decoded
            .resize_exact(CANVAS_DIM, CANVAS_DIM, FilterType::Lanczos3)
            .to_rgb8();
        let (avg_color, brightness, contrast) = canvas_stats(&normalized);

        let canvas = DynamicImage::ImageRgb8(normalized);
        let phash = hex_encode(self.phasher.hash_image(&canvas).as_bytes());
        let ahash = hex_encode(self.ahasher.hash_image(&canvas).as_bytes());

        ImageSignature {
            filename: filename.to_string(),
            content_hash,
            detected_kind,
            extension: extension.to_string(),
            is_vector,
            width,
            height,
            aspect_ratio,
            phash: Some(phash),
            ahash: Some(ahash),
            avg_color,
            brightness,
            contrast,
        }
    }
}

impl Default for SignatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean color, mean luma and luma standard deviation over one canvas.
fn canvas_stats(canvas: &RgbImage) -> ([u8; 3], f64, f64) {
    let n = (canvas.width() * canvas.height()) as f64;
    let mut channel_sums = [0.0f64; 3];
    let mut luma_sum = 0.0f64;
    let mut luma_sq_sum = 0.0f64;

    for pixel in canvas.pixels() {
        let mut luma = 0.0;
        for c in 0..3 {
            channel_sums[c] += pixel[c] as f64;
            luma += LUMA_WEIGHTS[c] * pixel[c] as f64;
        }
        luma_sum += luma;
        luma_sq_sum += luma * luma;
    }

    let avg_color = [
        (channel_sums[0] / n).round() as u8,
        (channel_sums[1] / n).round() as u8,
        (channel_sums[2] / n).round() as u8,
    ];
    let brightness = luma_sum / n;
    let contrast = (luma_sq_sum / n - brightness * brightness).max(0.0).sqrt();
    (avg_color, brightness, contrast)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb(pixel(x, y)));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_extract_populates_every_field() {
        let bytes = png_bytes(100, 50, |x, y| [((x + y) % 256) as u8, 0, 255]);
        let extractor = SignatureExtractor::new();
        let sig = extractor.extract_bytes("logo.png", "png", &bytes);

        assert_eq!(sig.content_hash.len(), 64);
        assert!(sig.content_hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(sig.detected_kind, FileKind::Png);
        assert!(!sig.is_vector);
        assert_eq!((sig.width, sig.height), (100, 50));
        assert!((sig.aspect_ratio - 2.0).abs() < f64::EPSILON);
        assert_eq!(sig.phash.as_ref().unwrap().len(), 16);
        assert_eq!(sig.ahash.as_ref().unwrap().len(), 16);
        assert!(sig.brightness > 0.0 && sig.brightness < 255.0);
        assert!(sig.contrast > 0.0);
    }

    #[test]
    fn test_uniform_image_statistics() {
        let bytes = png_bytes(32, 32, |_, _| [10, 20, 30]);
        let extractor = SignatureExtractor::new();
        let sig = extractor.extract_bytes("flat.png", "png", &bytes);

        assert_eq!(sig.avg_color, [10, 20, 30]);
        let expected_luma = 0.299 * 10.0 + 0.587 * 20.0 + 0.114 * 30.0;
        assert!((sig.brightness - expected_luma).abs() < 0.5);
        assert!(sig.contrast < 0.5);
    }

    #[test]
    fn test_identical_bytes_identical_content_hash() {
        let bytes = png_bytes(16, 16, |x, _| [x as u8, 0, 0]);
        let extractor = SignatureExtractor::new();
        let a = extractor.extract_bytes("a.png", "png", &bytes);
        let b = extractor.extract_bytes("b.ico", "ico", &bytes);
        assert_eq!(a.content_hash, b.content_hash);
        // Content sniffing sees the same PNG either way.
        assert_eq!(b.detected_kind, FileKind::Png);
    }

    #[test]
    fn test_vector_signature_from_declared_geometry() {
        let markup = r##"<svg width="100" height="50" fill="#102030"></svg>"##;
        let extractor = SignatureExtractor::new();
        let sig = extractor.extract_bytes("brand.svg", "svg", markup.as_bytes());

        assert!(sig.is_vector);
        assert_eq!(sig.detected_kind, FileKind::Svg);
        assert_eq!((sig.width, sig.height), (100, 50));
        assert_eq!(sig.avg_color, [16, 32, 48]);
        assert!(sig.phash.is_some());
    }

    #[test]
    fn test_unreadable_file_degrades() {
        let dir = TempDir::new().unwrap();
        let extractor = SignatureExtractor::new();
        let sig = extractor.extract_path(dir.path(), "missing.png");

        assert_eq!(sig.content_hash, CONTENT_HASH_ERROR);
        assert!(!sig.has_valid_hash());
        assert_eq!(sig.detected_kind, FileKind::Error);
        assert_eq!(sig.phash, None);
        assert_eq!(sig.avg_color, [128, 128, 128]);
        assert!((sig.aspect_ratio - 1.0).abs() < f64::EPSILON);

        // The vector flag follows the extension even when sniffing failed.
        let svg_sig = extractor.extract_path(dir.path(), "missing.svg");
        assert!(svg_sig.is_vector);
    }

    #[test]
    fn test_corrupt_bytes_still_produce_signature() {
        let extractor = SignatureExtractor::new();
        let sig = extractor.extract_bytes("bad.png", "png", b"not an image at all");

        // Readable but undecodable: real content hash, placeholder features.
        assert!(sig.has_valid_hash());
        assert_eq!((sig.width, sig.height), (64, 64));
        assert_eq!(sig.avg_color, raster::PLACEHOLDER_GRAY);
    }
}
