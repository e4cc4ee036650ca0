// Declare the algorithm modules
pub mod clustering;
pub mod common_types;
pub mod error;
pub mod learning;

#[cfg(feature = "python")]
mod python;

pub use clustering::{Cluster, SpanningTreeClusters};
pub use common_types::{DataPoint, Scalar, VectorRecord, create_missing_values, fill_missing_values, is_missing, missing};
pub use error::{LearningError, LearningResult};
pub use learning::{
    Activation, AdaptiveDataSet, DataLearning, DataSet, DiffusionConfig, Insertion, TestPrediction, VectorMask,
    approximation_set, distance, distance_masked, distribute_data, normalize_coordinates,
};
