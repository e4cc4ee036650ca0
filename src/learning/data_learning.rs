//! Kernel-weighted diffusion over a dataset (Nadaraya–Watson style regression).

use super::data_set::DataSet;
use super::distance::distance_with;
use super::heap_utils::n_smallest;
use super::mask::VectorMask;
use crate::common_types::{Scalar, VectorRecord, cast, is_missing};
use crate::error::{LearningError, LearningResult};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use rayon::prelude::*;

/// Kernel applied to the floored, powered distance `w`. Every variant decreases in `w`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Activation<F> {
    /// `1 / w^2`
    InverseSquare,
    /// `1 / w`
    Inverse,
    /// `exp(-gamma * w)`
    Exponential { gamma: F },
}

impl<F: Scalar> Activation<F> {
    pub fn apply(&self, w: F) -> F {
        match self {
            Activation::InverseSquare => F::one() / (w * w),
            Activation::Inverse => F::one() / w,
            Activation::Exponential { gamma } => (-(*gamma) * w).exp(),
        }
    }
}

/// Tunable knobs of a [`DataLearning`] engine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiffusionConfig<F> {
    /// Lower bound of the powered distance. Small values make the closest records dominate;
    /// it also replaces a total weight that is too small to divide by.
    pub theta: F,
    /// Exponent applied to the distance before weighting. Larger values sharpen locality.
    pub coefficient: F,
    pub activation: Activation<F>,
}

impl<F: Scalar> Default for DiffusionConfig<F> {
    fn default() -> Self {
        DiffusionConfig {
            theta: cast(0.001),
            coefficient: cast(2.0),
            activation: Activation::InverseSquare,
        }
    }
}

impl<F: Scalar> DiffusionConfig<F> {
    pub fn with_theta(mut self, theta: F) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_coefficient(mut self, coefficient: F) -> Self {
        self.coefficient = coefficient;
        self
    }

    pub fn with_activation(mut self, activation: Activation<F>) -> Self {
        self.activation = activation;
        self
    }

    pub fn validate(&self) -> LearningResult<()> {
        if !self.theta.is_finite() || self.theta <= F::zero() {
            return Err(LearningError::InvalidParameter {
                name: "theta",
                reason: format!("must be finite and positive, got {:?}", self.theta),
            });
        }
        if !self.coefficient.is_finite() {
            return Err(LearningError::InvalidParameter {
                name: "coefficient",
                reason: format!("must be finite, got {:?}", self.coefficient),
            });
        }
        if let Activation::Exponential { gamma } = self.activation {
            if !gamma.is_finite() || gamma <= F::zero() {
                return Err(LearningError::InvalidParameter {
                    name: "gamma",
                    reason: format!("must be finite and positive, got {:?}", gamma),
                });
            }
        }
        // Every kernel decreases, so the weight at theta bounds all weights.
        if !self.activation.apply(self.theta).is_finite() {
            return Err(LearningError::InvalidParameter {
                name: "theta",
                reason: format!("{:?} makes the largest kernel weight overflow", self.theta),
            });
        }
        Ok(())
    }
}

/// Model that uses multidimensional diffusion to find the "average on closest" of a dataset
/// around an input vector.
///
/// Missing input positions (`< -1`) are ignored by the distance, and missing record positions
/// contribute nothing to the weighted sum while the record's weight still counts.
#[derive(Debug, Clone)]
pub struct DataLearning<F: Scalar> {
    config: DiffusionConfig<F>,
    mask: Option<VectorMask<F>>,
}

impl<F: Scalar> Default for DataLearning<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Scalar> DataLearning<F> {
    pub fn new() -> Self {
        DataLearning { config: DiffusionConfig::default(), mask: None }
    }

    pub fn with_config(config: DiffusionConfig<F>) -> LearningResult<Self> {
        config.validate()?;
        Ok(DataLearning { config, mask: None })
    }

    /// Restricts the kernel distance to the positions allowed by `mask`.
    pub fn with_mask(mut self, mask: VectorMask<F>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn config(&self) -> &DiffusionConfig<F> {
        &self.config
    }

    /// Replaces the whole configuration. An invalid one leaves the engine unchanged.
    pub fn set_config(&mut self, config: DiffusionConfig<F>) -> LearningResult<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn mask(&self) -> Option<&VectorMask<F>> {
        self.mask.as_ref()
    }

    pub fn theta(&self) -> F {
        self.config.theta
    }

    pub fn set_theta(&mut self, theta: F) -> LearningResult<()> {
        self.set_config(self.config.with_theta(theta))
    }

    pub fn coefficient(&self) -> F {
        self.config.coefficient
    }

    pub fn set_coefficient(&mut self, coefficient: F) -> LearningResult<()> {
        self.set_config(self.config.with_coefficient(coefficient))
    }

    /// Distance used by the kernel: missing-aware, restricted by the engine mask if any.
    pub fn distance(&self, a: &[F], b: &[F]) -> F {
        distance_with(a, b, self.mask.as_ref())
    }

    /// Weight of a record at `distance` from the input: `activation(max(distance^coefficient, theta))`.
    pub fn weight(&self, distance: F) -> F {
        let powered = distance.powf(self.config.coefficient).max(self.config.theta);
        self.config.activation.apply(powered)
    }

    fn floor_total(&self, total: F) -> F {
        if total < self.config.theta { F::one() } else { total }
    }

    /// Calls `on_element` with every record and its kernel weight relative to `input`,
    /// then returns the total weight (replaced by 1 when it is below theta).
    pub fn for_each_coefficient<'r, R, V>(&self, data: &'r DataSet<R>, input: &[F], mut on_element: V) -> F
    where
        R: VectorRecord<Scalar = F>,
        V: FnMut(usize, &'r R, F),
    {
        let mut total = F::zero();
        for (index, record) in data.iter().enumerate() {
            let coefficient = self.weight(self.distance(input, record.vector()));
            on_element(index, record, coefficient);
            total = total + coefficient;
        }
        self.floor_total(total)
    }

    /// Diffuses the dataset on `input`.
    ///
    /// Returns the kernel-weighted average of all records, of the dataset's declared length.
    /// An empty dataset yields the zero vector.
    pub fn diffuse<R>(&self, data: &DataSet<R>, input: &[F]) -> LearningResult<Vec<F>>
    where
        R: VectorRecord<Scalar = F>,
    {
        LearningError::check_dimension(data.input_vector_length(), input.len())?;
        trace!("Diffusing {} records on input of length {}", data.len(), input.len());
        Ok(self.weighted_average(data.records().par_iter(), data.input_vector_length(), input))
    }

    /// Same as [`DataLearning::diffuse`] restricted to the `n` records closest to `input`.
    pub fn diffuse_on_n_closest<R>(&self, data: &DataSet<R>, input: &[F], n: usize) -> LearningResult<Vec<F>>
    where
        R: VectorRecord<Scalar = F>,
    {
        LearningError::check_dimension(data.input_vector_length(), input.len())?;
        if n == 0 {
            return Err(LearningError::InvalidParameter {
                name: "n",
                reason: "number of closest records must be greater than 0".to_string(),
            });
        }
        let closest = self.n_closest(data, input, n);
        trace!("Diffusing on {} closest of {} records", closest.len(), data.len());
        let records = data.records();
        Ok(self.weighted_average(
            closest.par_iter().map(|&index| &records[index]),
            data.input_vector_length(),
            input,
        ))
    }

    /// Indices of the `n` records closest to `input`, closest first.
    pub fn n_closest<R>(&self, data: &DataSet<R>, input: &[F], n: usize) -> Vec<usize>
    where
        R: VectorRecord<Scalar = F>,
    {
        let distances = data.iter().enumerate().map(|(index, record)| (self.distance(input, record.vector()).as_(), index));
        n_smallest(distances, n.min(data.len())).into_iter().map(|(_, index)| index).collect()
    }

    fn weighted_average<'r, R, I>(&self, records: I, length: usize, input: &[F]) -> Vec<F>
    where
        R: VectorRecord<Scalar = F> + 'r,
        I: ParallelIterator<Item = &'r R>,
    {
        let (sum, total) = records
            .fold(
                || (vec![F::zero(); length], F::zero()),
                |(mut sum, total), record| {
                    let coefficient = self.weight(self.distance(input, record.vector()));
                    // Missing record values are excluded from the sum, not imputed.
                    for (acc, &x) in sum.iter_mut().zip(record.vector()) {
                        if !is_missing(x) {
                            *acc = *acc + x * coefficient;
                        }
                    }
                    (sum, total + coefficient)
                },
            )
            .reduce(
                || (vec![F::zero(); length], F::zero()),
                |(mut left, left_total), (right, right_total)| {
                    for (a, b) in left.iter_mut().zip(right) {
                        *a = *a + b;
                    }
                    (left, left_total + right_total)
                },
            );
        let total = self.floor_total(total);
        sum.into_iter().map(|x| x / total).collect()
    }

    /// Diffuses `error` back into every record, weighted by closeness to `input`.
    ///
    /// Each record value `x` at a position where neither `x` nor `error` is missing becomes
    /// `x - error * coefficient / total`. Records are updated in parallel; each task touches
    /// exactly one record.
    pub fn diffuse_error<R>(&self, data: &mut DataSet<R>, input: &[F], error: &[F]) -> LearningResult<()>
    where
        R: VectorRecord<Scalar = F>,
    {
        let length = data.input_vector_length();
        LearningError::check_dimension(length, input.len())?;
        LearningError::check_dimension(length, error.len())?;
        if data.is_empty() {
            return Ok(());
        }

        let coefficients: Vec<F> = data
            .records()
            .par_iter()
            .map(|record| self.weight(self.distance(input, record.vector())))
            .collect();
        let total = self.floor_total(coefficients.iter().copied().sum());
        trace!("Diffusing error over {} records, total weight {:?}", coefficients.len(), total);

        data.records_mut()
            .par_iter_mut()
            .zip(coefficients.par_iter())
            .for_each(|(record, &coefficient)| {
                let share = coefficient / total;
                for (x, &e) in record.vector_mut().iter_mut().zip(error.iter()) {
                    if is_missing(*x) || is_missing(e) {
                        continue;
                    }
                    *x = *x - e * share;
                }
            });
        Ok(())
    }

    /// Finds the record closest to `element`.
    ///
    /// The scan runs in parallel with a lock-guarded running minimum; exact ties resolve to the
    /// lowest index, matching a sequential first-found scan.
    ///
    /// # Errors
    /// `EmptyDataSet` when there is nothing to compare with.
    pub fn get_closest<'r, R>(&self, data: &'r DataSet<R>, element: &[F]) -> LearningResult<(usize, &'r R)>
    where
        R: VectorRecord<Scalar = F>,
    {
        LearningError::check_dimension(data.input_vector_length(), element.len())?;
        let best: Mutex<Option<(F, usize)>> = Mutex::new(None);
        data.records().par_iter().enumerate().for_each(|(index, record)| {
            let mut dist = self.distance(record.vector(), element);
            if dist.is_nan() {
                dist = F::infinity();
            }
            let mut guard = best.lock();
            let keep_current = match *guard {
                Some((best_dist, best_index)) => {
                    best_dist < dist || (best_dist == dist && best_index < index)
                }
                None => false,
            };
            if !keep_current {
                *guard = Some((dist, index));
            }
        });

        match best.into_inner() {
            Some((dist, index)) => {
                if dist == F::zero() && element.iter().all(|&x| is_missing(x)) {
                    warn!("Closest-record search with an all-missing element: every distance is 0");
                }
                trace!("Closest record is {} at distance {:?}", index, dist);
                Ok((index, &data.records()[index]))
            }
            None => Err(LearningError::EmptyDataSet { operation: "get_closest" }),
        }
    }

    /// Normalizes the allowed positions of the dataset into `[0, 1]`.
    /// See [`super::helpers::normalize_coordinates`].
    pub fn normalize_coordinates<R>(&self, data: &mut DataSet<R>, mask: Option<&VectorMask<F>>)
    where
        R: VectorRecord<Scalar = F>,
    {
        debug!("Normalizing coordinates of {} records", data.len());
        super::helpers::normalize_coordinates(data, mask);
    }
}
