//! Consuming side of the upstream acquisition stage's checkpoint artifact.
//!
//! The downloader that hunts brand images across web origins records, per
//! source URL, how its fetch cascade resolved (favicon services first, then
//! page scraping, then domain-root probing). This module only reads that
//! record to derive provenance statistics; the cascade itself, including
//! its retry and timeout policy, is entirely the downloader's concern.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("could not open checkpoint {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How the fetch cascade resolved for one source URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    FaviconService,
    HtmlFavicon,
    OgImage,
    CommonPath,
    ImgCandidate,
    DomainRoot,
    NotFound,
    AccessError,
    Exception,
}

impl FetchOutcome {
    /// Whether this outcome delivered payload bytes.
    pub fn is_hit(&self) -> bool {
        !matches!(
            self,
            FetchOutcome::NotFound | FetchOutcome::AccessError | FetchOutcome::Exception
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FetchOutcome::FaviconService => "favicon_service",
            FetchOutcome::HtmlFavicon => "html_favicon",
            FetchOutcome::OgImage => "og_image",
            FetchOutcome::CommonPath => "common_path",
            FetchOutcome::ImgCandidate => "img_candidate",
            FetchOutcome::DomainRoot => "domain_root",
            FetchOutcome::NotFound => "not_found",
            FetchOutcome::AccessError => "access_error",
            FetchOutcome::Exception => "exception",
        }
    }
}

/// One checkpoint line: the cascade outcome for one source URL. Payload
/// bytes live in the corpus folder, never in the checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRecord {
    pub url: String,
    pub outcome: FetchOutcome,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub content_md5: Option<String>,
    #[serde(default)]
    pub fetched_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointSummary {
    pub total: usize,
    pub hits: usize,
    pub malformed: usize,
    pub by_outcome: BTreeMap<FetchOutcome, usize>,
}

/// Read a JSONL checkpoint, tolerating malformed lines (the producer is a
/// long-running batch job that can be interrupted mid-write).
pub fn read_checkpoint(path: &Path) -> Result<(Vec<FetchRecord>, usize), CheckpointError> {
    let file = File::open(path).map_err(|source| CheckpointError::Open {
        path: path.display().to_string(),
        source,
    })?;

    let mut records = Vec::new();
    let mut malformed = 0usize;
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<FetchRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                malformed += 1;
                warn!(line = lineno + 1, error = %e, "skipping malformed checkpoint line");
            }
        }
    }
    Ok((records, malformed))
}

pub fn summarize(records: &[FetchRecord], malformed: usize) -> CheckpointSummary {
    let mut summary = CheckpointSummary {
        total: records.len(),
        malformed,
        ..Default::default()
    };
    for record in records {
        if record.outcome.is_hit() {
            summary.hits += 1;
        }
        *summary.by_outcome.entry(record.outcome).or_insert(0) += 1;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_and_summarize() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checkpoint.jsonl");
        fs::write(
            &path,
            concat!(
                r#"{"url":"https://a.example","outcome":"favicon_service","size":1024,"content_md5":"abcd"}"#,
                "\n",
                r#"{"url":"https://b.example","outcome":"og_image","size":2048}"#,
                "\n",
                "this line is garbage\n",
                r#"{"url":"https://c.example","outcome":"not_found","size":null}"#,
                "\n",
            ),
        )
        .unwrap();

        let (records, malformed) = read_checkpoint(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(malformed, 1);

        let summary = summarize(&records, malformed);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.hits, 2);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.by_outcome[&FetchOutcome::FaviconService], 1);
        assert_eq!(summary.by_outcome[&FetchOutcome::NotFound], 1);
    }

    #[test]
    fn test_unknown_outcome_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checkpoint.jsonl");
        fs::write(
            &path,
            r#"{"url":"https://a.example","outcome":"carrier_pigeon"}"#,
        )
        .unwrap();

        let (records, malformed) = read_checkpoint(&path).unwrap();
        assert!(records.is_empty());
        assert_eq!(malformed, 1);
    }

    #[test]
    fn test_missing_checkpoint_errors() {
        let err = read_checkpoint(Path::new("/no/such/checkpoint.jsonl")).unwrap_err();
        assert!(matches!(err, CheckpointError::Open { .. }));
    }
}
