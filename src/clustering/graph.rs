//! Nearest-neighbor graph, Kruskal spanning forest and connected components over record indices.

use crate::common_types::{Scalar, VectorRecord};
use crate::error::{LearningError, LearningResult};
use crate::learning::DataSet;
use crate::learning::distance::distance_with;
use crate::learning::heap_utils::n_smallest;
use crate::learning::mask::VectorMask;
use log::debug;
use num_traits::AsPrimitive;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::VecDeque;

/// Undirected weighted edge between two record indices, stored with `source < target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge<F> {
    pub source: usize,
    pub target: usize,
    pub weight: F,
}

impl<F> Edge<F> {
    pub fn new(a: usize, b: usize, weight: F) -> Self {
        Edge { source: a.min(b), target: a.max(b), weight }
    }
}

/// Ascending by weight (NaN last), ties broken by endpoints so the order is total and repeatable.
fn by_weight<F: Scalar>(a: &Edge<F>, b: &Edge<F>) -> Ordering {
    let weight = |e: &Edge<F>| OrderedFloat::<f64>(e.weight.as_());
    weight(a)
        .cmp(&weight(b))
        .then(a.source.cmp(&b.source))
        .then(a.target.cmp(&b.target))
}

/// Union-find with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    pub fn new(size: usize) -> Self {
        DisjointSet { parent: (0..size).collect(), rank: vec![0; size] }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }

    /// Merges the sets of `a` and `b`. Returns false if they were already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            Ordering::Less => self.parent[ra] = rb,
            Ordering::Greater => self.parent[rb] = ra,
            Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }
}

/// Connects every record to its `k` nearest other records by the masked distance.
///
/// The result has no duplicate pairs and no self-loops.
pub fn nearest_neighbor_edges<R>(
    data: &DataSet<R>,
    k: usize,
    mask: Option<&VectorMask<R::Scalar>>,
) -> LearningResult<Vec<Edge<R::Scalar>>>
where
    R: VectorRecord,
{
    if k == 0 {
        return Err(LearningError::InvalidParameter {
            name: "connect_to_closest",
            reason: "every record needs at least one neighbor".to_string(),
        });
    }
    let records = data.records();
    let k = k.min(records.len().saturating_sub(1));
    let mut edges: Vec<Edge<R::Scalar>> = records
        .par_iter()
        .enumerate()
        .flat_map_iter(|(i, record)| {
            let candidates = records.iter().enumerate().filter(move |&(j, _)| j != i).map(|(j, other)| {
                let d = distance_with(record.vector(), other.vector(), mask);
                (d.as_(), (j, d))
            });
            n_smallest(candidates, k).into_iter().map(move |(_, (j, d))| Edge::new(i, j, d))
        })
        .collect();

    edges.sort_unstable_by(|a, b| a.source.cmp(&b.source).then(a.target.cmp(&b.target)));
    edges.dedup_by(|a, b| a.source == b.source && a.target == b.target);
    debug!("Nearest-neighbor graph: {} nodes, {} edges (k = {})", records.len(), edges.len(), k);
    Ok(edges)
}

/// Minimum spanning forest of the graph on `node_count` nodes, edges in ascending weight order.
pub fn spanning_forest_kruskal<F: Scalar>(node_count: usize, mut edges: Vec<Edge<F>>) -> Vec<Edge<F>> {
    edges.sort_by(by_weight);
    let mut sets = DisjointSet::new(node_count);
    let forest: Vec<Edge<F>> = edges.into_iter().filter(|e| sets.union(e.source, e.target)).collect();
    debug!("Spanning forest: {} nodes, {} edges", node_count, forest.len());
    forest
}

/// Connected components, each sorted ascending, ordered by their smallest node.
pub fn connected_components<F>(node_count: usize, edges: &[Edge<F>]) -> Vec<Vec<usize>> {
    let mut adjacency = vec![Vec::new(); node_count];
    for edge in edges {
        adjacency[edge.source].push(edge.target);
        adjacency[edge.target].push(edge.source);
    }

    let mut visited = vec![false; node_count];
    let mut components = Vec::new();
    for start in 0..node_count {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut component = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for &next in &adjacency[node] {
                if !visited[next] {
                    visited[next] = true;
                    component.push(next);
                    queue.push_back(next);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disjoint_set() {
        let mut sets = DisjointSet::new(4);
        assert!(sets.union(0, 1));
        assert!(sets.union(2, 3));
        assert!(!sets.union(1, 0));
        assert_ne!(sets.find(0), sets.find(3));
        assert!(sets.union(1, 3));
        assert_eq!(sets.find(0), sets.find(2));
    }

    #[test]
    fn test_nearest_neighbor_edges_are_unique() {
        let data = DataSet::from_records(1, vec![vec![0.0_f64], vec![1.0], vec![3.0]]).unwrap();
        let edges = nearest_neighbor_edges(&data, 1, None).unwrap();
        // 0-1 is found from both ends, 2 connects to 1.
        assert_eq!(edges, vec![Edge::new(0, 1, 1.0), Edge::new(1, 2, 2.0)]);
        assert!(edges.iter().all(|e| e.source < e.target));

        let all = nearest_neighbor_edges(&data, 10, None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(nearest_neighbor_edges(&data, usize::MAX, None).unwrap(), all);
        assert!(nearest_neighbor_edges(&data, 0, None).is_err());
    }

    #[test]
    fn test_kruskal_skips_cycles() {
        let edges = vec![
            Edge::new(0, 1, 1.0_f64),
            Edge::new(1, 2, 2.0),
            Edge::new(0, 2, 2.5),
            Edge::new(3, 4, 0.5),
        ];
        let forest = spanning_forest_kruskal(5, edges);
        assert_eq!(forest, vec![Edge::new(3, 4, 0.5), Edge::new(0, 1, 1.0), Edge::new(1, 2, 2.0)]);
    }

    #[test]
    fn test_kruskal_orders_nan_weights_last() {
        let edges = vec![
            Edge::new(0, 1, f64::NAN),
            Edge::new(1, 2, 1.0),
            Edge::new(0, 2, 3.0),
            Edge::new(2, 3, f64::NAN),
        ];
        let forest = spanning_forest_kruskal(4, edges);
        assert_eq!(forest.len(), 3);
        assert_eq!((forest[0].source, forest[0].target), (1, 2));
        assert_eq!((forest[1].source, forest[1].target), (0, 2));
        assert_eq!((forest[2].source, forest[2].target), (2, 3));
    }

    #[test]
    fn test_connected_components() {
        let edges = vec![Edge::new(0, 2, 1.0_f64), Edge::new(3, 4, 1.0)];
        assert_eq!(connected_components(5, &edges), vec![vec![0, 2], vec![1], vec![3, 4]]);
        assert!(connected_components::<f64>(0, &[]).is_empty());
    }
}
