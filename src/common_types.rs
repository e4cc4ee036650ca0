//! This module contains the record types and the missing-value convention shared by every algorithm.
//!
//! A vector component is "missing" when its value is strictly less than `-1`. The crate writes
//! `-2` when it needs to mark a position as missing.

use num_traits::{AsPrimitive, Float};
use rand::Rng;
use std::fmt::Debug;
use std::iter::Sum;

/// Numeric bound used by every algorithm in the crate (`f32` and `f64` satisfy it).
pub trait Scalar: Float + AsPrimitive<f64> + Sum + Send + Sync + Debug + 'static {}

impl<T> Scalar for T where T: Float + AsPrimitive<f64> + Sum + Send + Sync + Debug + 'static {}

/// Converts an `f64` constant into the working scalar type.
pub(crate) fn cast<F: Scalar>(value: f64) -> F {
    F::from(value).unwrap_or_else(F::nan)
}

/// The value written into positions that should be treated as missing.
pub fn missing<F: Scalar>() -> F {
    -(F::one() + F::one())
}

/// Returns true if `value` is a missing component (`value < -1`).
#[inline]
pub fn is_missing<F: Scalar>(value: F) -> bool {
    value < -F::one()
}

/// Capability of a record that is backed by a fixed-length numeric vector.
///
/// Distance, diffusion and clustering only ever talk to records through this trait, so any
/// storage that can hand out a slice of its values can be used as a dataset element.
pub trait VectorRecord: Clone + Send + Sync {
    type Scalar: Scalar;

    fn vector(&self) -> &[Self::Scalar];

    /// Mutable view of the values. The slice can be written but never resized.
    fn vector_mut(&mut self) -> &mut [Self::Scalar];

    fn from_vector(values: Vec<Self::Scalar>) -> Self;

    fn dimension(&self) -> usize {
        self.vector().len()
    }
}

/// Represents a single record held by a dataset.
///
/// The same vector serves as input and output; masks decide which positions play which role
/// for a given operation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataPoint<F> {
    pub features: Vec<F>,
}

impl<F> DataPoint<F> {
    pub fn new(features: Vec<F>) -> Self {
        DataPoint { features }
    }
}

impl<F: Scalar> From<Vec<F>> for DataPoint<F> {
    fn from(features: Vec<F>) -> Self {
        DataPoint { features }
    }
}

impl<F: Scalar> VectorRecord for DataPoint<F> {
    type Scalar = F;

    fn vector(&self) -> &[F] {
        &self.features
    }

    fn vector_mut(&mut self) -> &mut [F] {
        &mut self.features
    }

    fn from_vector(values: Vec<F>) -> Self {
        DataPoint { features: values }
    }
}

impl<F: Scalar> VectorRecord for Vec<F> {
    type Scalar = F;

    fn vector(&self) -> &[F] {
        self
    }

    fn vector_mut(&mut self) -> &mut [F] {
        self
    }

    fn from_vector(values: Vec<F>) -> Self {
        values
    }
}

/// Writes every known (non-missing) value of `input` over `result`.
///
/// Used to turn a diffused vector into a restored one: prediction only fills the gaps.
pub fn fill_missing_values<F: Scalar>(input: &[F], mut result: Vec<F>) -> Vec<F> {
    for (slot, &value) in result.iter_mut().zip(input.iter()) {
        if !is_missing(value) {
            *slot = value;
        }
    }
    result
}

/// Returns a copy of `vector` where each position is hidden with probability `percent`.
///
/// Vectors that already contain missing values are returned unchanged.
pub fn create_missing_values<F: Scalar, G: Rng + ?Sized>(vector: &[F], percent: f64, rng: &mut G) -> Vec<F> {
    if vector.iter().any(|&x| is_missing(x)) {
        return vector.to_vec();
    }
    vector
        .iter()
        .map(|&x| if rng.gen_bool(percent.clamp(0.0, 1.0)) { missing() } else { x })
        .collect()
}
