//! Prediction quality of an adaptive dataset over held-out vectors.

use super::adaptive::AdaptiveDataSet;
use crate::common_types::{Scalar, VectorRecord, cast, create_missing_values, is_missing};
use crate::error::{LearningError, LearningResult};
use log::debug;
use num_traits::{Float, Zero};
use rand::Rng;

/// Per-position prediction differences over a test set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TestPrediction<F> {
    /// Mean of `actual - predicted`.
    pub difference: Vec<F>,
    /// Mean of `|actual - predicted|`.
    pub abs_difference: Vec<F>,
    /// The single test difference with the largest absolute sum.
    pub max_difference: Vec<F>,
}

impl<F: Scalar> TestPrediction<F> {
    /// Sum of `|difference|`.
    pub fn error(&self) -> F {
        self.difference.iter().map(|x| x.abs()).sum()
    }

    pub fn abs_error(&self) -> F {
        self.abs_difference.iter().copied().sum()
    }

    pub fn max_error(&self) -> F {
        self.max_difference.iter().map(|x| x.abs()).sum()
    }
}

fn abs_sum<F: Scalar>(vector: &[F]) -> F {
    vector.iter().map(|x| x.abs()).sum()
}

impl<R: VectorRecord> AdaptiveDataSet<R> {
    /// Predicts every test vector from `get_input(actual)` and accumulates the differences.
    ///
    /// `get_input` must hide (set below `-1`) the positions the model is expected to restore.
    /// Positions missing in the actual vector cannot be scored and count as a zero difference.
    pub fn compute_prediction_error<G>(&self, test: &[Vec<R::Scalar>], get_input: G) -> LearningResult<TestPrediction<R::Scalar>>
    where
        G: Fn(&[R::Scalar]) -> Vec<R::Scalar>,
    {
        if test.is_empty() {
            return Err(LearningError::EmptyDataSet { operation: "compute_prediction_error" });
        }
        let length = self.input_vector_length();
        let zero = R::Scalar::zero();
        let mut difference = vec![zero; length];
        let mut abs_difference = vec![zero; length];
        let mut max_difference = vec![zero; length];

        for actual in test {
            LearningError::check_dimension(length, actual.len())?;
            let prediction = self.predict(&get_input(actual))?;
            let diff: Vec<R::Scalar> = actual
                .iter()
                .zip(prediction.iter())
                .map(|(&a, &p)| if is_missing(a) { zero } else { a - p })
                .collect();
            for ((d, a), &x) in difference.iter_mut().zip(abs_difference.iter_mut()).zip(diff.iter()) {
                *d = *d + x;
                *a = *a + x.abs();
            }
            if abs_sum(&max_difference) < abs_sum(&diff) {
                max_difference = diff;
            }
        }

        let count = cast::<R::Scalar>(test.len() as f64);
        for (d, a) in difference.iter_mut().zip(abs_difference.iter_mut()) {
            *d = *d / count;
            *a = *a / count;
        }
        let result = TestPrediction { difference, abs_difference, max_difference };
        debug!(
            "Prediction error over {} vectors: error {:?}, abs {:?}, max {:?}",
            test.len(),
            result.error(),
            result.abs_error(),
            result.max_error()
        );
        Ok(result)
    }

    /// Mean L2 restoration error when each position of a complete test vector is hidden with
    /// probability `percent_of_missing_values` and restored with a pure prediction.
    ///
    /// Test vectors that already contain missing values are skipped, but the mean is still
    /// taken over the whole test set.
    pub fn compute_pure_prediction_error<G: Rng + ?Sized>(
        &self,
        test: &[Vec<R::Scalar>],
        percent_of_missing_values: f64,
        rng: &mut G,
    ) -> LearningResult<R::Scalar> {
        if test.is_empty() {
            return Err(LearningError::EmptyDataSet { operation: "compute_pure_prediction_error" });
        }
        if !(0.0..=1.0).contains(&percent_of_missing_values) {
            return Err(LearningError::InvalidParameter {
                name: "percent_of_missing_values",
                reason: format!("{} is not a probability", percent_of_missing_values),
            });
        }
        let mut total = R::Scalar::zero();
        for input in test {
            LearningError::check_dimension(self.input_vector_length(), input.len())?;
            if input.iter().any(|&x| is_missing(x)) {
                continue;
            }
            let hidden = create_missing_values(input, percent_of_missing_values, rng);
            let restored = self.predict_pure(&hidden)?;
            let squared: R::Scalar = input.iter().zip(restored.iter()).map(|(&a, &b)| (a - b) * (a - b)).sum();
            total = total + squared.sqrt();
        }
        Ok(total / cast(test.len() as f64))
    }
}
