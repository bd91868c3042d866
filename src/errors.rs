use thiserror::Error;
use std::io;
use std::path::PathBuf;

use crate::bucket_queue::BucketState;

/// Error types for the IFT engine and its segmentation glue
#[derive(Error, Debug)]
pub enum IftError {
    #[error("Failed to allocate {count} {what}")]
    Allocation {
        what: &'static str,
        count: usize,
    },

    #[error("Double insertion of node {node} with weight {weight}")]
    DoubleInsertion {
        node: usize,
        weight: usize,
    },

    #[error("Removal from an empty bucket queue")]
    QueueUnderflow,

    #[error("Weight {weight} of node {node} exceeds the queue window of {max_weight}")]
    WeightOutOfRange {
        node: usize,
        weight: i64,
        max_weight: usize,
    },

    #[error("Node {node} is not linked in bucket of weight {weight}")]
    NodeNotInBucket {
        node: usize,
        weight: usize,
    },

    #[error("Invalid state {state:?} of node {node} for {operation}")]
    InvalidState {
        node: usize,
        operation: &'static str,
        state: BucketState,
    },

    #[error("Node {node} is out of range for {node_count} nodes")]
    NodeOutOfRange {
        node: usize,
        node_count: usize,
    },

    #[error("Dimension mismatch in {map}: expected {expected}, found {found}")]
    DimensionMismatch {
        map: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Predecessor map contains a cycle through node {node}")]
    PredecessorCycle {
        node: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Invalid seed file line {line}: {message}")]
    SeedParse {
        line: usize,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),
}

/// Coarse classification of [`IftError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Allocation,
    InvariantViolation,
    Configuration,
    Io,
}

impl IftError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IftError::Allocation { .. } => ErrorKind::Allocation,
            IftError::DoubleInsertion { .. }
            | IftError::QueueUnderflow
            | IftError::WeightOutOfRange { .. }
            | IftError::NodeNotInBucket { .. }
            | IftError::InvalidState { .. }
            | IftError::NodeOutOfRange { .. }
            | IftError::DimensionMismatch { .. }
            | IftError::PredecessorCycle { .. } => ErrorKind::InvariantViolation,
            IftError::Config(_) | IftError::ConfigLoad { .. } | IftError::SeedParse { .. } => {
                ErrorKind::Configuration
            }
            IftError::Io(_)
            | IftError::Image(_)
            | IftError::CsvOutput(_)
            | IftError::Json(_)
            | IftError::InvalidPath(_) => ErrorKind::Io,
        }
    }

    pub fn is_invariant_violation(&self) -> bool {
        self.kind() == ErrorKind::InvariantViolation
    }
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, IftError>;
