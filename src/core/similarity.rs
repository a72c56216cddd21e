use std::collections::HashMap;

use crate::core::signature::{HASH_BITS, ImageSignature};

/// Maximum Euclidean distance between two RGB means: √(3 · 255²).
pub const MAX_COLOR_DISTANCE: f64 = 441.67;

const WEIGHT_PHASH: f64 = 0.4;
const WEIGHT_COLOR: f64 = 0.3;
const WEIGHT_BRIGHTNESS: f64 = 0.1;
const WEIGHT_ASPECT: f64 = 0.1;
const WEIGHT_KIND: f64 = 0.1;
const KIND_MATCH_SCORE: f64 = 0.8;

/// Weighted multi-signal similarity between two signatures, with a
/// memoization cache keyed by the unordered filename pair.
///
/// One scorer is owned by one clustering run and dropped with it; since
/// signatures are immutable for the duration of a run the cache is never
/// invalidated.
pub struct SimilarityScorer {
    cache: HashMap<(String, String), f64>,
}

impl SimilarityScorer {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Score in [0, 1]; symmetric; 1.0 for self and for byte-exact
    /// duplicates regardless of every other signal.
    pub fn score(&mut self, a: &ImageSignature, b: &ImageSignature) -> f64 {
        if a.filename == b.filename {
            return 1.0;
        }
        let key = pair_key(&a.filename, &b.filename);
        if let Some(&cached) = self.cache.get(&key) {
            return cached;
        }
        let score = compute_score(a, b);
        self.cache.insert(key, score);
        score
    }

    /// Number of distinct pairs scored so far.
    pub fn cached_pairs(&self) -> usize {
        self.cache.len()
    }
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// The weighted mean over whichever signals are available. An unavailable
/// signal contributes to neither numerator nor denominator, so a missing
/// perceptual hash never drags the score down.
fn compute_score(a: &ImageSignature, b: &ImageSignature) -> f64 {
    if a.has_valid_hash() && b.has_valid_hash() && a.content_hash == b.content_hash {
        return 1.0;
    }

    let mut weighted = 0.0;
    let mut total_weight = 0.0;

    if let (Some(pa), Some(pb)) = (&a.phash, &b.phash) {
        if let Some(dist) = hamming_distance(pa, pb) {
            let sim = (1.0 - dist as f64 / HASH_BITS as f64).max(0.0);
            weighted += WEIGHT_PHASH * sim;
            total_weight += WEIGHT_PHASH;
        }
    }

    let color_dist = euclidean(a.avg_color, b.avg_color);
    weighted += WEIGHT_COLOR * (1.0 - color_dist / MAX_COLOR_DISTANCE).max(0.0);
    total_weight += WEIGHT_COLOR;

    let brightness_sim = (1.0 - (a.brightness - b.brightness).abs() / 255.0).max(0.0);
    weighted += WEIGHT_BRIGHTNESS * brightness_sim;
    total_weight += WEIGHT_BRIGHTNESS;

    // Coarse check: saturates to zero at an aspect delta of 1.0 or more.
    let aspect_sim = (1.0 - (a.aspect_ratio - b.aspect_ratio).abs()).max(0.0);
    weighted += WEIGHT_ASPECT * aspect_sim;
    total_weight += WEIGHT_ASPECT;

    // Omitted, not zero, on a kind mismatch: omission shrinks the
    // denominator, which is a materially different outcome.
    if a.detected_kind == b.detected_kind {
        weighted += WEIGHT_KIND * KIND_MATCH_SCORE;
        total_weight += WEIGHT_KIND;
    }

    if total_weight == 0.0 {
        0.0
    } else {
        weighted / total_weight
    }
}

/// Hamming distance between two hex-encoded 64-bit hashes.
fn hamming_distance(a_hex: &str, b_hex: &str) -> Option<u32> {
    let a = u64::from_str_radix(a_hex, 16).ok()?;
    let b = u64::from_str_radix(b_hex, 16).ok()?;
    Some((a ^ b).count_ones())
}

fn euclidean(a: [u8; 3], b: [u8; 3]) -> f64 {
    let mut sum = 0.0;
    for c in 0..3 {
        let d = a[c] as f64 - b[c] as f64;
        sum += d * d;
    }
    sum.sqrt()
}
