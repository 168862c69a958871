//! Machine learning building blocks for the training job.
//!
//! Everything here is deterministic: the split is driven by a seeded RNG and the
//! classifier starts from zero weights, so the same inputs always produce the same
//! fitted pipeline.

pub mod logreg;
pub mod metrics;
pub mod pipeline;
pub mod scaler;
pub mod split;

pub use pipeline::{FittedPipeline, Pipeline, build_model};

/// Errors raised while fitting or applying the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("Empty training set")]
    EmptyTrainingSet,
    #[error("Mismatched training inputs/labels ({rows} rows, {labels} labels)")]
    LengthMismatch { rows: usize, labels: usize },
    #[error("Unexpected feature count {found} (expected {expected})")]
    FeatureCountMismatch { expected: usize, found: usize },
    #[error("Training labels must contain both classes, found only class {0}")]
    SingleClass(usize),
    #[error("Label {label} is outside the binary range (expected 0 or 1)")]
    LabelOutOfRange { label: usize },
    #[error("Non-finite value encountered in {0}")]
    NonFinite(&'static str),
    #[error("Invalid model: {0}")]
    InvalidModel(String),
    #[error(transparent)]
    Split(#[from] split::SplitError),
}
