use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

use crate::core::signature::ImageSignature;
use crate::core::similarity::SimilarityScorer;

/// Fuzzy-pass membership threshold. Calibrated against the single-link
/// grouping rule below; changing either changes downstream group sizes.
pub const SIMILARITY_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// Byte-identical content hashes.
    Exact,
    /// Fuzzy match at or above the threshold.
    Similar,
    /// Singleton.
    Unique,
}

impl GroupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKind::Exact => "exact",
            GroupKind::Similar => "similar",
            GroupKind::Unique => "unique",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One cluster of the output partition. Groups are never mutated after
/// creation, only re-sorted for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub kind: GroupKind,
    /// Corpus filenames, in corpus order, non-empty, disjoint across groups.
    pub members: Vec<String>,
    /// Mean pairwise similarity; 1.0 for exact groups and singletons.
    pub average_similarity: f64,
}

impl Group {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Turns a signature set into a disjoint partition of groups.
///
/// The exact pass runs first and has strict priority: a file in an
/// exact-duplicate bucket is never reconsidered for fuzzy grouping. The
/// fuzzy pass is greedy single-link against the seed only, so a later
/// member may be less similar than the threshold to an earlier non-seed
/// member. This is not transitive-closure clustering; the threshold is
/// calibrated for the single-link rule and the rule must not change
/// silently.
pub struct ClusterPartitioner {
    threshold: f64,
}

impl ClusterPartitioner {
    pub fn new() -> Self {
        Self {
            threshold: SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Partition the corpus. `signatures` must be in corpus order
    /// (lexicographic by filename, as produced by the scanner): the fuzzy
    /// pass is order-sensitive for seed selection, and fixing the order is
    /// what makes runs reproducible.
    ///
    /// The similarity cache lives inside the scorer constructed here, so its
    /// lifetime is exactly one partitioning run.
    pub fn partition(&self, signatures: &[ImageSignature]) -> Vec<Group> {
        let mut scorer = SimilarityScorer::new();
        let n = signatures.len();
        let mut assigned = vec![false; n];
        let mut groups = Vec::new();

        // Exact pass: bucket by content hash, skipping the error sentinel
        // (unreadable files must never exact-match each other).
        let mut buckets: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, sig) in signatures.iter().enumerate() {
            if sig.has_valid_hash() {
                buckets.entry(sig.content_hash.as_str()).or_default().push(i);
            }
        }
        let mut emitted: HashSet<&str> = HashSet::new();
        for sig in signatures {
            if !sig.has_valid_hash() || emitted.contains(sig.content_hash.as_str()) {
                continue;
            }
            let bucket = &buckets[sig.content_hash.as_str()];
            if bucket.len() > 1 {
                emitted.insert(sig.content_hash.as_str());
                for &i in bucket {
                    assigned[i] = true;
                }
                groups.push(Group {
                    kind: GroupKind::Exact,
                    members: bucket.iter().map(|&i| signatures[i].filename.clone()).collect(),
                    average_similarity: 1.0,
                });
            }
        }
        debug!(exact_groups = groups.len(), "exact pass complete");

        // Fuzzy pass over the remaining files in corpus order: each
        // unassigned file seeds a candidate group, and every later
        // unassigned file joins when its similarity to the seed clears the
        // threshold.
        for i in 0..n {
            if assigned[i] {
                continue;
            }
            assigned[i] = true;
            let mut members = vec![i];
            for j in (i + 1)..n {
                if assigned[j] {
                    continue;
                }
                if scorer.score(&signatures[i], &signatures[j]) >= self.threshold {
                    assigned[j] = true;
                    members.push(j);
                }
            }

            if members.len() > 1 {
                let average = mean_pairwise(signatures, &members, &mut scorer);
                groups.push(Group {
                    kind: GroupKind::Similar,
                    members: members.iter().map(|&m| signatures[m].filename.clone()).collect(),
                    average_similarity: average,
                });
            } else {
                groups.push(Group {
                    kind: GroupKind::Unique,
                    members: vec![signatures[i].filename.clone()],
                    average_similarity: 1.0,
                });
            }
        }

        // Fill sweep: anything both passes somehow skipped becomes its own
        // singleton, so the union of members always equals the input set.
        for i in 0..n {
            if !assigned[i] {
                groups.push(Group {
                    kind: GroupKind::Unique,
                    members: vec![signatures[i].filename.clone()],
                    average_similarity: 1.0,
                });
            }
        }

        debug!(
            groups = groups.len(),
            scored_pairs = scorer.cached_pairs(),
            "partition complete"
        );
        groups
    }
}

impl Default for ClusterPartitioner {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean similarity over all pairs of final members, recomputed over the
/// full member set rather than reusing only the seed comparisons.
fn mean_pairwise(
    signatures: &[ImageSignature],
    members: &[usize],
    scorer: &mut SimilarityScorer,
) -> f64 {
    let mut sum = 0.0;
    let mut pairs = 0u64;
    for (x, &a) in members.iter().enumerate() {
        for &b in &members[x + 1..] {
            sum += scorer.score(&signatures[a], &signatures[b]);
            pairs += 1;
        }
    }
    if pairs == 0 { 1.0 } else { sum / pairs as f64 }
}
