//! Python bindings for the adaptive dataset, built with the `python` feature.

use crate::common_types::VectorRecord;
use crate::error::LearningError;
use crate::learning::{AdaptiveDataSet, Insertion, VectorMask, distance};
use pyo3::prelude::*;

impl From<LearningError> for PyErr {
    fn from(err: LearningError) -> PyErr {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(err.to_string())
    }
}

/// Missing-value-aware Euclidean distance between two vectors.
#[pyfunction]
fn distance_py(a: Vec<f64>, b: Vec<f64>) -> PyResult<f64> {
    Ok(distance(&a, &b))
}

/// Python-friendly choice of insertion policy.
#[pyclass(name = "InsertionPolicy")]
#[derive(Clone, Debug)]
enum PyInsertionPolicy {
    MergeWithClosest,
    ReplaceRandom,
    ReplaceClosest,
}

#[pyclass(name = "AdaptiveDataSet")]
struct PyAdaptiveDataSet {
    inner: AdaptiveDataSet<Vec<f64>>,
}

#[pymethods]
impl PyAdaptiveDataSet {
    #[new]
    #[pyo3(signature = (input_vector_length, max_elements, seed = None))]
    fn new(input_vector_length: usize, max_elements: usize, seed: Option<u64>) -> PyResult<Self> {
        let mut inner = AdaptiveDataSet::new(input_vector_length, max_elements)?;
        if let Some(seed) = seed {
            inner = inner.with_seed(seed);
        }
        Ok(PyAdaptiveDataSet { inner })
    }

    /// Inserts `element` and returns the index it was stored at.
    #[pyo3(signature = (element, policy = PyInsertionPolicy::MergeWithClosest))]
    fn add(&mut self, element: Vec<f64>, policy: PyInsertionPolicy) -> PyResult<usize> {
        let insertion: Insertion = match policy {
            PyInsertionPolicy::MergeWithClosest => self.inner.add_by_merging_with_closest(element)?,
            PyInsertionPolicy::ReplaceRandom => self.inner.add_by_replacing_random(element)?,
            PyInsertionPolicy::ReplaceClosest => self.inner.add_by_replacing_closest(element)?,
        };
        Ok(insertion.index())
    }

    /// Inserts `element`, merging its non-input positions with the model's prediction.
    fn add_by_merging_with_prediction(&mut self, element: Vec<f64>, inputs: Vec<usize>) -> PyResult<usize> {
        let mask = VectorMask::indices(inputs);
        Ok(self.inner.add_by_merging_with_prediction(element, &mask)?.index())
    }

    fn predict(&self, input: Vec<f64>) -> PyResult<Vec<f64>> {
        Ok(self.inner.predict(&input)?)
    }

    fn predict_pure(&self, input: Vec<f64>) -> PyResult<Vec<f64>> {
        Ok(self.inner.predict_pure(&input)?)
    }

    fn predict_on_n_closest(&self, input: Vec<f64>, n: usize) -> PyResult<Vec<f64>> {
        Ok(self.inner.predict_on_n_closest(&input, n)?)
    }

    fn diffuse_error(&mut self, input: Vec<f64>, error: Vec<f64>) -> PyResult<()> {
        Ok(self.inner.diffuse_error(&input, &error)?)
    }

    /// Runs the self-organizing schedule, moving the positions listed in `coordinates`.
    fn cluster_by_sequence(&mut self, coordinates: Vec<usize>, start: f64) -> PyResult<()> {
        let mask = VectorMask::indices(coordinates);
        Ok(self.inner.cluster_by_sequence(&mask, start)?)
    }

    /// Record indices of every clustering produced by cutting the spanning forest, finest last.
    #[pyo3(signature = (connect_to_closest, skip_iterations = 0))]
    fn clusters_by_spanning_tree(&self, connect_to_closest: usize, skip_iterations: usize) -> PyResult<Vec<Vec<Vec<usize>>>> {
        let labelings = self
            .inner
            .clusters_by_spanning_tree(connect_to_closest, skip_iterations, None)?
            .map(|clusters| clusters.into_iter().map(|c| c.indices).collect())
            .collect();
        Ok(labelings)
    }

    fn records(&self) -> Vec<Vec<f64>> {
        self.inner.data_set().iter().map(|r| r.vector().to_vec()).collect()
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    #[getter]
    fn max_elements(&self) -> usize {
        self.inner.max_elements()
    }

    #[getter]
    fn diffusion_coefficient(&self) -> f64 {
        self.inner.learning().coefficient()
    }

    #[setter]
    fn set_diffusion_coefficient(&mut self, value: f64) -> PyResult<()> {
        Ok(self.inner.learning_mut().set_coefficient(value)?)
    }
}

#[pymodule]
fn diffusion_learning(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(distance_py, m)?)?;
    m.add_class::<PyInsertionPolicy>()?;
    m.add_class::<PyAdaptiveDataSet>()?;
    Ok(())
}
