pub mod cluster;
pub mod format;
pub mod raster;
pub mod report;
pub mod scanner;
pub mod signature;
pub mod similarity;
pub mod vector;

pub use cluster::{ClusterPartitioner, Group, GroupKind, SIMILARITY_THRESHOLD};
pub use format::FileKind;
pub use report::ClusterReport;
pub use scanner::{CorpusScanner, ScanError};
pub use signature::{ImageSignature, SignatureExtractor};
pub use similarity::SimilarityScorer;
