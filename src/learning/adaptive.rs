//! Capacity-bounded dataset that keeps learning by merging new records into old ones.

use super::data_learning::DataLearning;
use super::data_set::DataSet;
use super::mask::VectorMask;
use crate::clustering::SpanningTreeClusters;
use crate::common_types::{VectorRecord, cast, fill_missing_values, is_missing, missing};
use crate::error::{LearningError, LearningResult};
use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Where an inserted record ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The dataset had room; the record was appended at this index.
    Appended(usize),
    /// The dataset was full; the record at this index was overwritten.
    Replaced(usize),
}

impl Insertion {
    pub fn index(&self) -> usize {
        match *self {
            Insertion::Appended(index) | Insertion::Replaced(index) => index,
        }
    }
}

/// Adaptive data set that holds a constant number of records and changes over time as new
/// records are merged with old ones.
///
/// It bounds the model size (and so the cost of every prediction) while keeping the ability
/// to learn. Until `max_elements` records are stored every insertion is an append; after that
/// every insertion overwrites an existing record, so the dataset never grows past capacity
/// and never has holes.
#[derive(Debug)]
pub struct AdaptiveDataSet<R: VectorRecord> {
    data_set: DataSet<R>,
    learning: DataLearning<R::Scalar>,
    max_elements: usize,
    rng: StdRng,
}

impl<R: VectorRecord> AdaptiveDataSet<R> {
    pub fn new(input_vector_length: usize, max_elements: usize) -> LearningResult<Self> {
        Self::with_learning(DataSet::with_capacity(input_vector_length, max_elements), DataLearning::new(), max_elements)
    }

    /// Wraps an existing dataset and engine.
    pub fn with_learning(
        data_set: DataSet<R>,
        learning: DataLearning<R::Scalar>,
        max_elements: usize,
    ) -> LearningResult<Self> {
        if max_elements == 0 {
            return Err(LearningError::InvalidCapacity);
        }
        if data_set.len() > max_elements {
            return Err(LearningError::InvalidParameter {
                name: "max_elements",
                reason: format!("dataset already holds {} records, more than {}", data_set.len(), max_elements),
            });
        }
        Ok(AdaptiveDataSet { data_set, learning, max_elements, rng: StdRng::from_entropy() })
    }

    /// Seeds the generator used by the random replacement policies.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn data_set(&self) -> &DataSet<R> {
        &self.data_set
    }

    pub fn learning(&self) -> &DataLearning<R::Scalar> {
        &self.learning
    }

    pub fn learning_mut(&mut self) -> &mut DataLearning<R::Scalar> {
        &mut self.learning
    }

    pub fn max_elements(&self) -> usize {
        self.max_elements
    }

    pub fn input_vector_length(&self) -> usize {
        self.data_set.input_vector_length()
    }

    pub fn len(&self) -> usize {
        self.data_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_set.is_empty()
    }

    pub fn clear(&mut self) {
        self.data_set.clear();
    }

    fn check_length(&self, vector: &[R::Scalar]) -> LearningResult<()> {
        LearningError::check_dimension(self.input_vector_length(), vector.len())
    }

    /// Appends if there is room, otherwise hands the element back.
    fn try_append(&mut self, element: R) -> LearningResult<Result<Insertion, R>> {
        if self.data_set.len() < self.max_elements {
            let index = self.data_set.push(element)?;
            trace!("Appended record at {} ({}/{})", index, self.data_set.len(), self.max_elements);
            return Ok(Ok(Insertion::Appended(index)));
        }
        Ok(Err(element))
    }

    fn replace(&mut self, index: usize, element: R) -> LearningResult<Insertion> {
        self.data_set.replace(index, element)?;
        trace!("Replaced record at {}", index);
        Ok(Insertion::Replaced(index))
    }

    fn random_index(&mut self) -> usize {
        self.rng.gen_range(0..self.data_set.len())
    }

    fn closest_index(&self, element: &R) -> LearningResult<usize> {
        self.learning.get_closest(&self.data_set, element.vector()).map(|(index, _)| index)
    }

    /// Restores `input`: missing positions (`< -1`) are filled by prediction, known positions
    /// are returned unchanged. For example `(1, 0.5, 0.3, -2, -2, 0.2)` gets positions 3 and 4
    /// predicted.
    ///
    /// An empty dataset returns `input` as is.
    pub fn predict(&self, input: &[R::Scalar]) -> LearningResult<Vec<R::Scalar>> {
        self.check_length(input)?;
        if self.data_set.is_empty() {
            warn!("Prediction on an empty adaptive dataset returns the input unchanged");
            return Ok(input.to_vec());
        }
        let result = self.learning.diffuse(&self.data_set, input)?;
        Ok(fill_missing_values(input, result))
    }

    /// What the model thinks belongs at every position of `input`, known positions included.
    ///
    /// A well-fitted input comes back close to itself; a large difference flags an anomaly.
    /// An empty dataset returns `input` as is.
    pub fn predict_pure(&self, input: &[R::Scalar]) -> LearningResult<Vec<R::Scalar>> {
        self.check_length(input)?;
        if self.data_set.is_empty() {
            warn!("Pure prediction on an empty adaptive dataset returns the input unchanged");
            return Ok(input.to_vec());
        }
        self.learning.diffuse(&self.data_set, input)
    }

    /// [`AdaptiveDataSet::predict`] using only the `n` closest records.
    pub fn predict_on_n_closest(&self, input: &[R::Scalar], n: usize) -> LearningResult<Vec<R::Scalar>> {
        self.check_length(input)?;
        if self.data_set.is_empty() {
            return Ok(input.to_vec());
        }
        let result = self.learning.diffuse_on_n_closest(&self.data_set, input, n)?;
        Ok(fill_missing_values(input, result))
    }

    /// Replaces every record of `approximation` by the prediction on `get_input(record)`.
    /// Records are processed in parallel. Nothing happens when this dataset is empty.
    pub fn predict_into<A, G>(&self, approximation: &mut DataSet<A>, get_input: G) -> LearningResult<()>
    where
        A: VectorRecord<Scalar = R::Scalar>,
        G: Fn(&[R::Scalar]) -> Vec<R::Scalar> + Sync,
    {
        self.predict_batch(approximation, |input| self.predict(input), get_input)
    }

    /// [`AdaptiveDataSet::predict_into`] using only the `n` closest records per point.
    pub fn predict_on_n_closest_into<A, G>(
        &self,
        approximation: &mut DataSet<A>,
        get_input: G,
        n: usize,
    ) -> LearningResult<()>
    where
        A: VectorRecord<Scalar = R::Scalar>,
        G: Fn(&[R::Scalar]) -> Vec<R::Scalar> + Sync,
    {
        self.predict_batch(approximation, |input| self.predict_on_n_closest(input, n), get_input)
    }

    fn predict_batch<A, P, G>(&self, approximation: &mut DataSet<A>, predict: P, get_input: G) -> LearningResult<()>
    where
        A: VectorRecord<Scalar = R::Scalar>,
        P: Fn(&[R::Scalar]) -> LearningResult<Vec<R::Scalar>> + Sync,
        G: Fn(&[R::Scalar]) -> Vec<R::Scalar> + Sync,
    {
        LearningError::check_dimension(self.input_vector_length(), approximation.input_vector_length())?;
        if self.data_set.is_empty() {
            return Ok(());
        }
        debug!("Predicting {} approximation records", approximation.len());
        // All predictions succeed before any record is written.
        let predictions: Vec<Vec<R::Scalar>> = approximation
            .records()
            .par_iter()
            .map(|record| predict(&get_input(record.vector())))
            .collect::<LearningResult<_>>()?;
        approximation
            .records_mut()
            .par_iter_mut()
            .zip(predictions.par_iter())
            .for_each(|(record, prediction)| record.vector_mut().copy_from_slice(prediction));
        Ok(())
    }

    /// Diffuses `error` into the dataset around `input`. See [`DataLearning::diffuse_error`].
    pub fn diffuse_error(&mut self, input: &[R::Scalar], error: &[R::Scalar]) -> LearningResult<()> {
        self.learning.diffuse_error(&mut self.data_set, input, error)
    }

    /// Appends while there is room, otherwise replaces a uniformly random record.
    pub fn add_by_replacing_random(&mut self, element: R) -> LearningResult<Insertion> {
        self.check_length(element.vector())?;
        match self.try_append(element)? {
            Ok(insertion) => Ok(insertion),
            Err(element) => {
                let index = self.random_index();
                self.replace(index, element)
            }
        }
    }

    /// Appends while there is room, otherwise replaces the record closest to `element`.
    pub fn add_by_replacing_closest(&mut self, element: R) -> LearningResult<Insertion> {
        self.check_length(element.vector())?;
        match self.try_append(element)? {
            Ok(insertion) => Ok(insertion),
            Err(element) => {
                let index = self.closest_index(&element)?;
                self.replace(index, element)
            }
        }
    }

    /// Appends while there is room, otherwise replaces the closest record by the component-wise
    /// average of it and `element`.
    ///
    /// A position missing in one of the two takes the other's value; missing in both stays missing.
    pub fn add_by_merging_with_closest(&mut self, element: R) -> LearningResult<Insertion> {
        self.check_length(element.vector())?;
        match self.try_append(element)? {
            Ok(insertion) => Ok(insertion),
            Err(mut element) => {
                let (index, closest) = self.learning.get_closest(&self.data_set, element.vector())?;
                let closest = closest.vector().to_vec();
                let two = cast::<R::Scalar>(2.0);
                for (x, &y) in element.vector_mut().iter_mut().zip(closest.iter()) {
                    *x = match (is_missing(*x), is_missing(y)) {
                        (false, false) => (*x + y) / two,
                        (true, false) => y,
                        _ => *x,
                    };
                }
                self.replace(index, element)
            }
        }
    }

    /// Averages the non-input positions of `element` with the model's prediction from its
    /// input positions (the ones `inputs` allows).
    ///
    /// A missing element value takes the prediction; a position the model cannot predict keeps
    /// the element value.
    pub fn merge_with_prediction(&self, element: &mut R, inputs: &VectorMask<R::Scalar>) -> LearningResult<()> {
        self.check_length(element.vector())?;
        let query: Vec<R::Scalar> = element
            .vector()
            .iter()
            .enumerate()
            .map(|(i, &x)| if inputs.is_allowed_at(i) { x } else { missing() })
            .collect();
        let prediction = self.predict(&query)?;
        let two = cast::<R::Scalar>(2.0);
        for (i, (x, &p)) in element.vector_mut().iter_mut().zip(prediction.iter()).enumerate() {
            if inputs.is_allowed_at(i) || is_missing(p) {
                continue;
            }
            *x = if is_missing(*x) { p } else { (*x + p) / two };
        }
        Ok(())
    }

    /// Appends while there is room, otherwise merges `element` with the prediction (see
    /// [`AdaptiveDataSet::merge_with_prediction`]) and replaces the record closest to the
    /// original element.
    pub fn add_by_merging_with_prediction(&mut self, element: R, inputs: &VectorMask<R::Scalar>) -> LearningResult<Insertion> {
        self.check_length(element.vector())?;
        match self.try_append(element)? {
            Ok(insertion) => Ok(insertion),
            Err(mut element) => {
                let index = self.closest_index(&element)?;
                self.merge_with_prediction(&mut element, inputs)?;
                self.replace(index, element)
            }
        }
    }

    /// Like [`AdaptiveDataSet::add_by_merging_with_prediction`] but replaces a random record.
    pub fn add_by_merging_with_prediction_on_random(
        &mut self,
        element: R,
        inputs: &VectorMask<R::Scalar>,
    ) -> LearningResult<Insertion> {
        self.check_length(element.vector())?;
        match self.try_append(element)? {
            Ok(insertion) => Ok(insertion),
            Err(mut element) => {
                self.merge_with_prediction(&mut element, inputs)?;
                let index = self.random_index();
                self.replace(index, element)
            }
        }
    }

    /// One self-organizing pass: pulls records that are close in their non-coordinate positions
    /// close together in their coordinate positions (the ones `coordinates` allows).
    ///
    /// For every record the coordinates are predicted from the rest, and the residual
    /// (record minus prediction) is diffused back into the dataset. Coordinates are then
    /// renormalized into `[0, 1]`. Repeated passes with a decreasing diffusion coefficient
    /// sharpen the result; see [`AdaptiveDataSet::cluster_by_sequence`].
    pub fn cluster(&mut self, coordinates: &VectorMask<R::Scalar>) -> LearningResult<()> {
        if self.data_set.is_empty() {
            return Ok(());
        }
        debug!(
            "Self-organizing pass over {} records, coefficient {:?}",
            self.data_set.len(),
            self.learning.coefficient()
        );
        for index in 0..self.data_set.len() {
            let element = self.data_set.records()[index].vector().to_vec();
            let input = coordinates.hide(&element);
            let prediction = self.predict(&input)?;
            let residual: Vec<R::Scalar> = prediction
                .iter()
                .zip(element.iter())
                .map(|(&p, &e)| if is_missing(p) || is_missing(e) { missing() } else { e - p })
                .collect();
            self.learning.diffuse_error(&mut self.data_set, &element, &residual)?;
        }
        self.learning.normalize_coordinates(&mut self.data_set, Some(coordinates));
        Ok(())
    }

    /// Runs one [`AdaptiveDataSet::cluster`] pass per entry of `coefficients`, using that entry
    /// as the diffusion coefficient. The engine's coefficient is restored afterwards.
    pub fn cluster_with_schedule(
        &mut self,
        coordinates: &VectorMask<R::Scalar>,
        coefficients: &[R::Scalar],
    ) -> LearningResult<()> {
        let original = self.learning.coefficient();
        info!("Clustering with schedule {:?}", coefficients);
        let mut outcome = Ok(());
        for &coefficient in coefficients {
            outcome = self.learning.set_coefficient(coefficient).and_then(|_| self.cluster(coordinates));
            if outcome.is_err() {
                break;
            }
        }
        let restored = self.learning.set_coefficient(original);
        outcome.and(restored)
    }

    /// Three passes at `start`, two at `start - 2`, one at `start - 4`.
    pub fn cluster_by_sequence(&mut self, coordinates: &VectorMask<R::Scalar>, start: R::Scalar) -> LearningResult<()> {
        let two = cast::<R::Scalar>(2.0);
        let four = cast::<R::Scalar>(4.0);
        let schedule = [start, start, start, start - two, start - two, start - four];
        self.cluster_with_schedule(coordinates, &schedule)
    }

    /// Divisive clusters of the current records. See [`SpanningTreeClusters`].
    pub fn clusters_by_spanning_tree(
        &self,
        connect_to_closest: usize,
        skip_iterations: usize,
        mask: Option<&VectorMask<R::Scalar>>,
    ) -> LearningResult<SpanningTreeClusters<'_, R>> {
        SpanningTreeClusters::new(&self.data_set, connect_to_closest, skip_iterations, mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_types::DataPoint;
    use approx::assert_relative_eq;

    fn init() {
        let _ = env_logger::builder().filter_level(log::LevelFilter::Debug).is_test(true).try_init();
    }

    fn point(values: &[f64]) -> DataPoint<f64> {
        DataPoint::new(values.to_vec())
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert_eq!(AdaptiveDataSet::<DataPoint<f64>>::new(2, 0).err(), Some(LearningError::InvalidCapacity));
    }

    #[test]
    fn test_never_exceeds_capacity_with_any_policy() {
        init();
        let inputs = VectorMask::indices([0]);
        for policy in 0..5 {
            let mut adaptive = AdaptiveDataSet::new(2, 5).unwrap().with_seed(11);
            for i in 0..12 {
                let x = i as f64 / 12.0;
                let element = point(&[x, x * x]);
                let insertion = match policy {
                    0 => adaptive.add_by_merging_with_closest(element),
                    1 => adaptive.add_by_replacing_random(element),
                    2 => adaptive.add_by_replacing_closest(element),
                    3 => adaptive.add_by_merging_with_prediction(element, &inputs),
                    _ => adaptive.add_by_merging_with_prediction_on_random(element, &inputs),
                }
                .unwrap();
                if i < 5 {
                    assert_eq!(insertion, Insertion::Appended(i));
                } else {
                    assert!(matches!(insertion, Insertion::Replaced(index) if index < 5));
                }
                assert!(adaptive.len() <= adaptive.max_elements());
            }
            assert_eq!(adaptive.len(), 5, "policy {} must stay at capacity", policy);
        }
    }

    #[test]
    fn test_merge_with_closest_scenario() {
        let mut adaptive = AdaptiveDataSet::new(2, 2).unwrap();
        adaptive.add_by_merging_with_closest(point(&[0.0, 0.0])).unwrap();
        adaptive.add_by_merging_with_closest(point(&[1.0, 1.0])).unwrap();
        let insertion = adaptive.add_by_merging_with_closest(point(&[0.1, 0.1])).unwrap();

        assert_eq!(insertion, Insertion::Replaced(0));
        let records = adaptive.data_set().records();
        assert_relative_eq!(records[0].features[0], 0.05);
        assert_relative_eq!(records[0].features[1], 0.05);
        assert_eq!(records[1].features, vec![1.0, 1.0]);
    }

    #[test]
    fn test_merge_with_closest_is_exact_average() {
        let mut adaptive = AdaptiveDataSet::new(3, 3).unwrap();
        for values in [[0.0, 0.0, 0.0], [5.0, 5.0, 5.0], [0.3, 0.9, 0.1]] {
            adaptive.add_by_merging_with_closest(point(&values)).unwrap();
        }
        let before = adaptive.data_set().records()[2].features.clone();
        let element = [0.5, 0.7, 0.2];
        adaptive.add_by_merging_with_closest(point(&element)).unwrap();

        let after = &adaptive.data_set().records()[2].features;
        for i in 0..3 {
            assert_relative_eq!(after[i], (before[i] + element[i]) / 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_merge_with_closest_keeps_known_values_over_missing() {
        let mut adaptive = AdaptiveDataSet::new(2, 1).unwrap();
        adaptive.add_by_merging_with_closest(point(&[0.4, -2.0])).unwrap();
        adaptive.add_by_merging_with_closest(point(&[-2.0, 0.8])).unwrap();
        assert_eq!(adaptive.data_set().records()[0].features, vec![0.4, 0.8]);
    }

    #[test]
    fn test_replace_closest_overwrites_closest_record() {
        let mut adaptive = AdaptiveDataSet::new(1, 3).unwrap();
        for x in [0.0, 0.5, 1.0] {
            adaptive.add_by_replacing_closest(vec![x]).unwrap();
        }
        assert_eq!(adaptive.add_by_replacing_closest(vec![0.6]).unwrap(), Insertion::Replaced(1));
        assert_eq!(adaptive.data_set().records(), &[vec![0.0], vec![0.6], vec![1.0]]);
    }

    #[test]
    fn test_replace_random_is_reproducible_with_seed() {
        let run = || {
            let mut adaptive = AdaptiveDataSet::new(1, 4).unwrap().with_seed(42);
            (0..20).map(|i| adaptive.add_by_replacing_random(vec![i as f64]).unwrap().index()).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_merge_with_prediction_averages_outputs() {
        let inputs = VectorMask::indices([0]);
        let mut adaptive = AdaptiveDataSet::new(2, 2).unwrap();
        adaptive.add_by_merging_with_prediction(point(&[0.0, 0.0]), &inputs).unwrap();
        adaptive.add_by_merging_with_prediction(point(&[1.0, 10.0]), &inputs).unwrap();

        let insertion = adaptive.add_by_merging_with_prediction(point(&[0.0, 4.0]), &inputs).unwrap();
        assert_eq!(insertion, Insertion::Replaced(0));
        let merged = &adaptive.data_set().records()[0].features;
        assert_eq!(merged[0], 0.0, "input positions are kept");
        // The prediction at input 0 is almost exactly the stored output 0.
        assert_relative_eq!(merged[1], 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_merge_with_prediction_fills_missing_outputs() {
        let inputs = VectorMask::indices([0]);
        let mut adaptive = AdaptiveDataSet::new(2, 4).unwrap();
        adaptive.add_by_replacing_closest(point(&[0.5, 3.0])).unwrap();
        let mut element = point(&[0.5, -2.0]);
        adaptive.merge_with_prediction(&mut element, &inputs).unwrap();
        assert_relative_eq!(element.features[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_predict_on_empty_dataset_returns_input() {
        let adaptive = AdaptiveDataSet::<DataPoint<f64>>::new(3, 4).unwrap();
        let input = [0.1, -2.0, 0.4];
        assert_eq!(adaptive.predict(&input).unwrap(), input.to_vec());
        assert_eq!(adaptive.predict_pure(&input).unwrap(), input.to_vec());
        assert_eq!(adaptive.predict_on_n_closest(&input, 2).unwrap(), input.to_vec());
    }

    #[test]
    fn test_predict_fills_only_missing_positions() {
        let mut adaptive = AdaptiveDataSet::new(2, 4).unwrap();
        adaptive.add_by_replacing_closest(point(&[0.0, 1.0])).unwrap();
        adaptive.add_by_replacing_closest(point(&[1.0, 3.0])).unwrap();

        let restored = adaptive.predict(&[0.05, -2.0]).unwrap();
        assert_eq!(restored[0], 0.05);
        assert!(restored[1] > 1.0 && restored[1] < 1.1);

        let pure = adaptive.predict_pure(&[0.05, -2.0]).unwrap();
        assert!(pure[0] > 0.0 && pure[0] < 0.05, "pure prediction also rewrites known positions");

        assert!(matches!(
            adaptive.predict(&[0.0]),
            Err(LearningError::DimensionMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_predict_on_n_closest_uses_nearest_record() {
        let mut adaptive = AdaptiveDataSet::new(2, 4).unwrap();
        for values in [[0.0, 1.0], [0.3, 2.0], [1.0, 7.0]] {
            adaptive.add_by_replacing_closest(point(&values)).unwrap();
        }
        let restored = adaptive.predict_on_n_closest(&[0.9, -2.0], 1).unwrap();
        assert_eq!(restored[0], 0.9);
        assert_relative_eq!(restored[1], 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_predict_into_approximation_grid() {
        let mut adaptive = AdaptiveDataSet::new(2, 4).unwrap();
        adaptive.add_by_replacing_closest(vec![0.0, 0.0]).unwrap();
        adaptive.add_by_replacing_closest(vec![1.0, 1.0]).unwrap();

        let mut grid: DataSet<Vec<f64>> =
            crate::learning::helpers::approximation_set(4, 2, &[1.0, 1.0], &[0.0, 0.0]).unwrap();
        let hide_output = |v: &[f64]| vec![v[0], -2.0];
        adaptive.predict_into(&mut grid, hide_output).unwrap();
        for record in grid.iter() {
            assert!(!is_missing(record[1]));
            assert_relative_eq!(record[1], record[0], epsilon = 1e-5);
        }

        adaptive.predict_on_n_closest_into(&mut grid, hide_output, 1).unwrap();
        assert_relative_eq!(grid.records()[3][1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_failed_batch_prediction_leaves_approximation_untouched() {
        let mut adaptive = AdaptiveDataSet::new(2, 4).unwrap();
        adaptive.add_by_replacing_closest(vec![0.0, 0.0]).unwrap();
        adaptive.add_by_replacing_closest(vec![1.0, 1.0]).unwrap();

        let mut grid: DataSet<Vec<f64>> =
            crate::learning::helpers::approximation_set(4, 2, &[1.0, 1.0], &[0.0, 0.0]).unwrap();
        let before = grid.records().to_vec();
        // Only the last grid point produces an input of the wrong length.
        let ragged_input = |v: &[f64]| if v[0] == 1.0 && v[1] == 1.0 { vec![v[0]] } else { vec![v[0], -2.0] };

        assert_eq!(
            adaptive.predict_into(&mut grid, ragged_input),
            Err(LearningError::DimensionMismatch { expected: 2, found: 1 })
        );
        assert_eq!(grid.records(), before.as_slice());
        assert!(adaptive.predict_on_n_closest_into(&mut grid, ragged_input, 1).is_err());
        assert_eq!(grid.records(), before.as_slice());
    }

    #[test]
    fn test_schedule_with_invalid_coefficient_restores_original() {
        let mut adaptive = AdaptiveDataSet::new(2, 4).unwrap();
        adaptive.add_by_replacing_closest(vec![0.2, 0.4]).unwrap();
        let outcome = adaptive.cluster_with_schedule(&VectorMask::indices([0]), &[f64::NAN]);
        assert!(matches!(outcome, Err(LearningError::InvalidParameter { name: "coefficient", .. })));
        assert_relative_eq!(adaptive.learning().coefficient(), 2.0);
    }

    #[test]
    fn test_predict_on_n_closest_accepts_any_n() {
        let mut adaptive = AdaptiveDataSet::new(1, 3).unwrap();
        adaptive.add_by_replacing_closest(vec![0.2]).unwrap();
        adaptive.add_by_replacing_closest(vec![0.8]).unwrap();
        assert_eq!(adaptive.predict_on_n_closest(&[0.5], usize::MAX).unwrap(), vec![0.5]);
    }

    #[test]
    fn test_cluster_pass_normalizes_coordinates_and_keeps_features() {
        init();
        let mut rng = StdRng::seed_from_u64(3);
        let coordinates = VectorMask::indices([0, 1]);
        let mut adaptive = AdaptiveDataSet::new(4, 30).unwrap();
        for _ in 0..30 {
            let group = if rng.gen_bool(0.5) { 0.0 } else { 1.0 };
            let values = [rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0), group, rng.gen_range(0.0..0.1)];
            adaptive.add_by_replacing_random(point(&values)).unwrap();
        }
        let features_before: Vec<Vec<f64>> =
            adaptive.data_set().iter().map(|p| p.features[2..].to_vec()).collect();

        adaptive.cluster_by_sequence(&coordinates, 10.0).unwrap();

        assert_relative_eq!(adaptive.learning().coefficient(), 2.0);
        for (record, before) in adaptive.data_set().iter().zip(features_before.iter()) {
            for &x in record.features[..2].iter().filter(|&&x| !is_missing(x)) {
                assert!(x >= -1e-9 && x <= 1.0 + 1e-9, "coordinate {} outside [0, 1]", x);
            }
            assert_eq!(&record.features[2..], before.as_slice());
        }
    }

    #[test]
    fn test_cluster_on_empty_dataset_is_noop() {
        let mut adaptive = AdaptiveDataSet::<Vec<f64>>::new(3, 3).unwrap();
        adaptive.cluster(&VectorMask::indices([0])).unwrap();
        assert!(adaptive.is_empty());
    }

    #[test]
    fn test_diffuse_error_through_adaptive() {
        let mut adaptive = AdaptiveDataSet::new(1, 2).unwrap();
        adaptive.add_by_replacing_closest(vec![1.0]).unwrap();
        adaptive.diffuse_error(&[1.0], &[0.25]).unwrap();
        assert_relative_eq!(adaptive.data_set().records()[0][0], 0.75, epsilon = 1e-12);
    }
}
