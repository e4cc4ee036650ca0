//! Selection of the `n` smallest distances with a bounded binary heap.

use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A heap entry pairing a distance with the item it was measured to.
#[derive(Debug)]
struct HeapElement<P> {
    distance: OrderedFloat<f64>,
    data: P,
}

impl<P> PartialEq for HeapElement<P> {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}
impl<P> Eq for HeapElement<P> {}

impl<P> PartialOrd for HeapElement<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for HeapElement<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: the farthest kept element sits on top and is evicted first.
        self.distance.cmp(&other.distance)
    }
}

/// Returns the `n` items with the smallest distance, closest first.
///
/// Costs `O(m log n)` for `m` items. The heap never holds more than `min(n, m) + 1` entries,
/// so `n` may be arbitrarily large. NaN distances sort after every number.
pub fn n_smallest<P, I>(items: I, n: usize) -> Vec<(f64, P)>
where
    I: IntoIterator<Item = (f64, P)>,
{
    if n == 0 {
        return Vec::new();
    }
    let items = items.into_iter();
    let bound = items.size_hint().1.map_or(n, |upper| upper.min(n));
    let mut heap: BinaryHeap<HeapElement<P>> = BinaryHeap::with_capacity(bound.saturating_add(1));
    for (distance, data) in items {
        let item = HeapElement { distance: OrderedFloat(distance), data };
        if heap.len() < n {
            heap.push(item);
        } else if heap.peek().is_some_and(|farthest| item.distance < farthest.distance) {
            heap.pop();
            heap.push(item);
        }
    }
    heap.into_sorted_vec().into_iter().map(|e| (e.distance.0, e.data)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_n_smallest_in_order() {
        let distances = [5.0, 1.0, 4.0, 0.5, 3.0, 9.0];
        let best = n_smallest(distances.iter().copied().zip(0..), 3);
        assert_eq!(best, vec![(0.5, 3), (1.0, 1), (3.0, 4)]);
    }

    #[test]
    fn test_n_larger_than_input_keeps_everything() {
        let best = n_smallest([(2.0, 'b'), (1.0, 'a')], usize::MAX);
        assert_eq!(best, vec![(1.0, 'a'), (2.0, 'b')]);
    }

    #[test]
    fn test_zero_keeps_nothing_and_nan_sorts_last() {
        assert!(n_smallest([(1.0, "a")], 0).is_empty());
        let best = n_smallest([(f64::NAN, 0), (7.0, 1)], 1);
        assert_eq!(best, vec![(7.0, 1)]);
    }
}
