pub mod acquisition;
pub mod core;

pub use crate::core::cluster::{ClusterPartitioner, Group, GroupKind, SIMILARITY_THRESHOLD};
pub use crate::core::format::FileKind;
pub use crate::core::report::ClusterReport;
pub use crate::core::scanner::{CorpusScanner, ScanError};
pub use crate::core::signature::{ImageSignature, SignatureExtractor};
pub use crate::core::similarity::SimilarityScorer;
