use crate::common_types::{Scalar, missing};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

type Predicate<F> = dyn Fn(F, usize) -> bool + Send + Sync;

/// Decides which vector positions take part in a computation.
///
/// A mask composes with the missing-value rule: a position excluded by the mask is skipped even
/// when both values are known, and a missing value is skipped even when the mask allows it.
#[derive(Clone)]
pub struct VectorMask<F> {
    allowed: Arc<Predicate<F>>,
}

impl<F: Scalar> VectorMask<F> {
    /// `allowed(value, index)` returns whether the element at `index` holding `value` is used.
    pub fn new(allowed: impl Fn(F, usize) -> bool + Send + Sync + 'static) -> Self {
        VectorMask { allowed: Arc::new(allowed) }
    }

    /// Allows every position.
    pub fn all() -> Self {
        Self::new(|_, _| true)
    }

    /// Allows only the listed indices, whatever the value.
    pub fn indices(indices: impl IntoIterator<Item = usize>) -> Self {
        let set: HashSet<usize> = indices.into_iter().collect();
        Self::new(move |_, index| set.contains(&index))
    }

    /// Allows every index except the listed ones.
    pub fn except(indices: impl IntoIterator<Item = usize>) -> Self {
        let set: HashSet<usize> = indices.into_iter().collect();
        Self::new(move |_, index| !set.contains(&index))
    }

    /// Static test of an index, independent of any value.
    pub fn is_allowed_at(&self, index: usize) -> bool {
        (self.allowed)(-F::one(), index)
    }

    pub fn is_allowed(&self, value: F, index: usize) -> bool {
        (self.allowed)(value, index)
    }

    /// Copy of `vector` where every position allowed by this mask is marked missing.
    pub fn hide(&self, vector: &[F]) -> Vec<F> {
        vector
            .iter()
            .enumerate()
            .map(|(i, &x)| if self.is_allowed_at(i) { missing() } else { x })
            .collect()
    }
}

impl<F> fmt::Debug for VectorMask<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorMask").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common_types::is_missing;

    #[test]
    fn test_index_masks() {
        let mask = VectorMask::<f64>::indices([0, 2]);
        assert!(mask.is_allowed_at(0));
        assert!(!mask.is_allowed_at(1));
        assert!(mask.is_allowed(5.0, 2));

        let inverse = VectorMask::<f64>::except([0, 2]);
        assert!(!inverse.is_allowed_at(0));
        assert!(inverse.is_allowed_at(1));
    }

    #[test]
    fn test_value_predicate() {
        let non_negative = VectorMask::<f32>::new(|x, _| x >= 0.0);
        assert!(non_negative.is_allowed(0.5, 10));
        assert!(!non_negative.is_allowed(-0.5, 10));
    }

    #[test]
    fn test_hide_marks_allowed_positions_missing() {
        let coordinates = VectorMask::<f64>::indices([0, 1]);
        let hidden = coordinates.hide(&[0.3, 0.4, 1.0, 2.0]);
        assert!(is_missing(hidden[0]));
        assert!(is_missing(hidden[1]));
        assert_eq!(&hidden[2..], &[1.0, 2.0]);
    }
}
