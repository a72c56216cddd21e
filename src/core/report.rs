use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use crate::core::cluster::{Group, GroupKind};

/// Group-size histogram buckets, inclusive on both ends.
pub const SIZE_BUCKETS: &[(usize, usize)] = &[
    (1, 1),
    (2, 3),
    (4, 6),
    (7, 10),
    (11, 20),
    (21, 50),
    (51, 1000),
];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub total_files: usize,
    pub total_groups: usize,
    pub similarity_threshold: f64,
    pub created_at: String,
}

/// One group as serialized in the machine-readable report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRecord {
    /// Stable ordinal label in partition order, e.g. `group_0001`.
    pub id: String,
    pub kind: GroupKind,
    pub count: usize,
    pub members: Vec<String>,
    pub average_similarity: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub exact: usize,
    pub similar: usize,
    pub unique: usize,
}

/// The serialized output of one clustering run: metadata plus every group,
/// enough to re-check the partition invariant downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterReport {
    pub metadata: ReportMetadata,
    pub groups: Vec<GroupRecord>,
}

impl ClusterReport {
    pub fn build(groups: &[Group], total_files: usize, similarity_threshold: f64) -> Self {
        let records = groups
            .iter()
            .enumerate()
            .map(|(i, group)| GroupRecord {
                id: format!("group_{:04}", i + 1),
                kind: group.kind,
                count: group.len(),
                members: group.members.clone(),
                average_similarity: group.average_similarity,
            })
            .collect();

        Self {
            metadata: ReportMetadata {
                total_files,
                total_groups: groups.len(),
                similarity_threshold,
                created_at: Utc::now().to_rfc3339(),
            },
            groups: records,
        }
    }

    pub fn kind_counts(&self) -> KindCounts {
        let mut counts = KindCounts::default();
        for group in &self.groups {
            match group.kind {
                GroupKind::Exact => counts.exact += 1,
                GroupKind::Similar => counts.similar += 1,
                GroupKind::Unique => counts.unique += 1,
            }
        }
        counts
    }

    /// Bucket counts over [`SIZE_BUCKETS`]; buckets with no groups are kept
    /// so consumers see the full range.
    pub fn size_histogram(&self) -> Vec<((usize, usize), usize)> {
        SIZE_BUCKETS
            .iter()
            .map(|&(lo, hi)| {
                let count = self
                    .groups
                    .iter()
                    .filter(|g| (lo..=hi).contains(&g.count))
                    .count();
                ((lo, hi), count)
            })
            .collect()
    }

    pub fn average_group_size(&self) -> f64 {
        if self.groups.is_empty() {
            return 0.0;
        }
        let total: usize = self.groups.iter().map(|g| g.count).sum();
        total as f64 / self.groups.len() as f64
    }

    pub fn largest_group_size(&self) -> usize {
        self.groups.iter().map(|g| g.count).max().unwrap_or(0)
    }

    pub fn singleton_count(&self) -> usize {
        self.groups.iter().filter(|g| g.count == 1).count()
    }

    /// The `n` largest groups, size-descending, partition order breaking
    /// ties.
    pub fn largest(&self, n: usize) -> Vec<&GroupRecord> {
        let mut sorted: Vec<&GroupRecord> = self.groups.iter().collect();
        sorted.sort_by(|a, b| b.count.cmp(&a.count));
        sorted.truncate(n);
        sorted
    }

    /// Check the partition invariant against the input file set: every file
    /// in exactly one group, nothing extra.
    pub fn is_partition_of(&self, files: &[String]) -> bool {
        let mut seen = HashSet::new();
        for group in &self.groups {
            for member in &group.members {
                if !seen.insert(member.as_str()) {
                    return false;
                }
            }
        }
        let expected: HashSet<&str> = files.iter().map(String::as_str).collect();
        seen == expected
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn write_summary_file(&self, path: &Path) -> Result<(), ReportError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_summary(&mut writer)?;
        Ok(())
    }

    /// Human-readable counterpart of the JSON report.
    pub fn write_summary<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "LOGO CLUSTERING RESULTS")?;
        writeln!(out)?;
        writeln!(out, "Total files processed: {}", self.metadata.total_files)?;
        writeln!(out, "Total groups created: {}", self.metadata.total_groups)?;
        writeln!(
            out,
            "Similarity threshold: {:.2}",
            self.metadata.similarity_threshold
        )?;
        writeln!(out, "Date: {}", self.metadata.created_at)?;
        writeln!(out)?;

        writeln!(out, "GROUP STATISTICS:")?;
        let counts = self.kind_counts();
        let total = self.metadata.total_groups.max(1);
        for (kind, count) in [
            (GroupKind::Exact, counts.exact),
            (GroupKind::Similar, counts.similar),
            (GroupKind::Unique, counts.unique),
        ] {
            let percentage = count as f64 / total as f64 * 100.0;
            writeln!(out, "  {:<8}: {:>5} ({:>5.1}%)", kind, count, percentage)?;
        }
        writeln!(out)?;
        writeln!(out, "Average group size: {:.2}", self.average_group_size())?;
        writeln!(out, "Largest group: {} logos", self.largest_group_size())?;
        writeln!(out, "Singleton groups: {}", self.singleton_count())?;
        writeln!(out)?;

        writeln!(out, "GROUP SIZE DISTRIBUTION:")?;
        for ((lo, hi), count) in self.size_histogram() {
            if count > 0 {
                let percentage = count as f64 / total as f64 * 100.0;
                writeln!(
                    out,
                    "  {:>2}-{:<4} logos: {:>5} groups ({:>5.1}%)",
                    lo, hi, count, percentage
                )?;
            }
        }

        for (i, group) in self.largest(self.groups.len()).iter().enumerate() {
            writeln!(out)?;
            writeln!(out, "GROUP {}: {} - {} logos", i + 1, group.kind, group.count)?;
            writeln!(out, "Average similarity: {:.3}", group.average_similarity)?;
            if group.members.len() <= 10 {
                for (j, member) in group.members.iter().enumerate() {
                    writeln!(out, "{:>3}. {}", j + 1, member)?;
                }
            } else {
                for (j, member) in group.members.iter().take(5).enumerate() {
                    writeln!(out, "{:>3}. {}", j + 1, member)?;
                }
                writeln!(out, "... and {} more", group.members.len() - 5)?;
            }
        }
        Ok(())
    }
}
