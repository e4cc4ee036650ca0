//! Missing-value-aware Euclidean distance.

use super::mask::VectorMask;
use crate::common_types::{Scalar, is_missing};

/// Computes the L2 distance between two vectors on their common known sub-vector.
///
/// Any index where either operand is missing (`< -1`) is skipped entirely. For example
/// `(1, 2, 3, -2)` and `(-2, 1, 5, -4)` give `sqrt((2-1)^2 + (5-3)^2)`.
/// Only the first `min(a.len(), b.len())` positions are compared.
///
/// When every index is skipped the result is `0`, which callers cannot tell apart from
/// "identical".
pub fn distance<F: Scalar>(a: &[F], b: &[F]) -> F {
    a.iter()
        .zip(b.iter())
        .filter(|&(&x, &y)| !is_missing(x) && !is_missing(y))
        .map(|(&x, &y)| {
            let diff = x - y;
            diff * diff
        })
        .sum::<F>()
        .sqrt()
}

/// Same as [`distance`], additionally skipping positions the mask does not allow.
pub fn distance_masked<F: Scalar>(a: &[F], b: &[F], mask: &VectorMask<F>) -> F {
    a.iter()
        .zip(b.iter())
        .enumerate()
        .filter(|&(i, (&x, &y))| {
            !is_missing(x) && !is_missing(y) && mask.is_allowed(x, i) && mask.is_allowed(y, i)
        })
        .map(|(_, (&x, &y))| {
            let diff = x - y;
            diff * diff
        })
        .sum::<F>()
        .sqrt()
}

/// Dispatches to [`distance_masked`] when a mask is present.
pub fn distance_with<F: Scalar>(a: &[F], b: &[F], mask: Option<&VectorMask<F>>) -> F {
    match mask {
        Some(mask) => distance_masked(a, b, mask),
        None => distance(a, b),
    }
}
