use rayon::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::info;
use walkdir::WalkDir;

use crate::core::signature::{ImageSignature, SignatureExtractor};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid corpus path: {path}")]
    InvalidPath { path: String },

    #[error("no image files found under {path}")]
    EmptyCorpus { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discovers corpus files and fans signature extraction out across a rayon
/// pool. Discovery filters on the extension allow-list only; the format
/// sniffer decides each file's real type from its bytes later.
pub struct CorpusScanner {
    extensions: HashSet<String>,
}

impl CorpusScanner {
    pub fn new() -> Self {
        let extensions = ["png", "jpg", "jpeg", "webp", "ico", "svg"]
            .into_iter()
            .map(String::from)
            .collect();
        Self { extensions }
    }

    /// Enumerate corpus files under `root`, as corpus-relative paths in
    /// lexicographic order. The order is part of the contract: the fuzzy
    /// clustering pass is order-sensitive for seed selection, so a fixed
    /// order is what makes runs reproducible.
    ///
    /// An empty or inaccessible corpus is the one fatal configuration error
    /// in the pipeline.
    pub fn discover(&self, root: &Path) -> Result<Vec<String>, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::InvalidPath {
                path: root.display().to_string(),
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !self.extensions.contains(&ext.to_lowercase()) {
                continue;
            }
            if let Ok(relative) = path.strip_prefix(root) {
                files.push(relative.to_string_lossy().to_string());
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(ScanError::EmptyCorpus {
                path: root.display().to_string(),
            });
        }
        info!(count = files.len(), root = %root.display(), "corpus discovered");
        Ok(files)
    }

    /// Extract signatures for every corpus file in parallel, preserving the
    /// input order in the output. Extraction has no cross-file data
    /// dependency (one independent signature per file, no shared mutable
    /// state), and per-file failures degrade the signature rather than the
    /// run.
    ///
    /// `on_file` is invoked once per completed file, from worker threads.
    pub fn extract_all<F>(&self, root: &Path, files: &[String], on_file: F) -> Vec<ImageSignature>
    where
        F: Fn(&str) + Sync,
    {
        let extractor = SignatureExtractor::new();
        files
            .par_iter()
            .map(|name| {
                let signature = extractor.extract_path(root, name);
                on_file(name);
                signature
            })
            .collect()
    }
}

impl Default for CorpusScanner {
    fn default() -> Self {
        Self::new()
    }
}
