//! Divisive clustering of a dataset by cutting its spanning forest.

pub mod graph;

use crate::common_types::{VectorRecord, cast, is_missing, missing};
use crate::error::LearningResult;
use crate::learning::DataSet;
use crate::learning::mask::VectorMask;
use graph::{Edge, connected_components, nearest_neighbor_edges, spanning_forest_kruskal};
use log::trace;
use num_traits::Zero;

/// A group of records borrowed from a dataset, with their component-wise average.
#[derive(Debug, Clone)]
pub struct Cluster<'a, R: VectorRecord> {
    pub indices: Vec<usize>,
    pub elements: Vec<&'a R>,
    /// Average over the non-missing values of each position; missing if no element has one.
    pub average: Vec<R::Scalar>,
}

impl<'a, R: VectorRecord> Cluster<'a, R> {
    pub fn from_indices(data: &'a DataSet<R>, indices: Vec<usize>) -> Self {
        let elements: Vec<&'a R> = indices.iter().map(|&i| &data.records()[i]).collect();
        let length = data.input_vector_length();
        let mut sum = vec![R::Scalar::zero(); length];
        let mut count = vec![0usize; length];
        for element in &elements {
            for (k, &x) in element.vector().iter().enumerate() {
                if !is_missing(x) {
                    sum[k] = sum[k] + x;
                    count[k] += 1;
                }
            }
        }
        let average = sum
            .into_iter()
            .zip(count)
            .map(|(s, n)| if n == 0 { missing() } else { s / cast(n as f64) })
            .collect();
        Cluster { indices, elements, average }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Iterator over successively finer clusterings of a dataset.
///
/// The dataset is turned into a graph where every record is connected to its closest records,
/// and the graph is reduced to its minimum spanning forest. Each step removes the longest
/// remaining forest edge and yields the connected components, so every item has exactly one
/// more cluster than the previous one. The first `skip_iterations` removals yield nothing.
pub struct SpanningTreeClusters<'a, R: VectorRecord> {
    data: &'a DataSet<R>,
    /// Forest edges, ascending. The longest remaining edge is at the end.
    forest: Vec<Edge<R::Scalar>>,
    skip_iterations: usize,
}

impl<'a, R: VectorRecord> SpanningTreeClusters<'a, R> {
    pub fn new(
        data: &'a DataSet<R>,
        connect_to_closest: usize,
        skip_iterations: usize,
        mask: Option<&VectorMask<R::Scalar>>,
    ) -> LearningResult<Self> {
        let forest = if data.is_empty() {
            Vec::new()
        } else {
            spanning_forest_kruskal(data.len(), nearest_neighbor_edges(data, connect_to_closest, mask)?)
        };
        Ok(SpanningTreeClusters { data, forest, skip_iterations })
    }

    /// Edges that are still in the forest.
    pub fn remaining_edges(&self) -> &[Edge<R::Scalar>] {
        &self.forest
    }
}

impl<'a, R: VectorRecord> Iterator for SpanningTreeClusters<'a, R> {
    type Item = Vec<Cluster<'a, R>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let removed = self.forest.pop()?;
            trace!("Removed forest edge {}-{} of weight {:?}", removed.source, removed.target, removed.weight);
            if self.skip_iterations > 0 {
                self.skip_iterations -= 1;
                continue;
            }
            let data = self.data;
            let clusters = connected_components(data.len(), &self.forest)
                .into_iter()
                .map(|indices| Cluster::from_indices(data, indices))
                .collect();
            return Some(clusters);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.forest.len().saturating_sub(self.skip_iterations);
        (left, Some(left))
    }
}
