use thiserror::Error;

/// Errors returned at the call boundary of datasets, the diffusion engine and adaptive datasets.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LearningError {
    /// The operation needs at least one record.
    #[error("There is no data in dataset: {operation} requires a non-empty dataset")]
    EmptyDataSet { operation: &'static str },

    #[error("Vector length mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Adaptive dataset capacity must be greater than 0")]
    InvalidCapacity,

    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

pub type LearningResult<T> = Result<T, LearningError>;

impl LearningError {
    pub(crate) fn check_dimension(expected: usize, found: usize) -> LearningResult<()> {
        if expected == found {
            Ok(())
        } else {
            Err(LearningError::DimensionMismatch { expected, found })
        }
    }
}
