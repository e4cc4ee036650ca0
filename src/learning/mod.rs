//! Kernel diffusion over datasets of vectors with missing values.
//!
//! [`DataLearning`] turns a [`DataSet`] into a smooth function: a query vector is restored as the
//! weighted average of all records, each weighted by an activation of its distance to the query.
//! [`AdaptiveDataSet`] keeps such a dataset at a fixed size while new records keep arriving.

pub mod adaptive;
pub mod data_learning;
pub mod data_set;
pub mod distance;
pub mod evaluation;
pub mod heap_utils;
pub mod helpers;
pub mod mask;

pub use adaptive::{AdaptiveDataSet, Insertion};
pub use data_learning::{Activation, DataLearning, DiffusionConfig};
pub use data_set::DataSet;
pub use distance::{distance, distance_masked, distance_with};
pub use evaluation::TestPrediction;
pub use helpers::{approximation_set, distribute_data, normalize_coordinates};
pub use mask::VectorMask;
