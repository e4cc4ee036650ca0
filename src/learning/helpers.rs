//! Coordinate normalization and even distribution of records in the unit hypercube.

use super::data_set::DataSet;
use super::mask::VectorMask;
use crate::common_types::{Scalar, VectorRecord, cast, is_missing};
use crate::error::{LearningError, LearningResult};
use log::debug;
use num_traits::{Float, One, Zero};

fn allowed<F: Scalar>(mask: Option<&VectorMask<F>>, value: F, index: usize) -> bool {
    !is_missing(value) && mask.map_or(true, |m| m.is_allowed(value, index))
}

/// Linearly maps every allowed, non-missing position of the dataset into `[0, 1]`.
///
/// Per-dimension minimum and maximum are taken over the allowed values only. A dimension whose
/// range is empty (all values equal, or no allowed values) is left as is.
pub fn normalize_coordinates<R: VectorRecord>(data: &mut DataSet<R>, mask: Option<&VectorMask<R::Scalar>>) {
    if data.is_empty() {
        return;
    }
    let length = data.input_vector_length();
    let mut min = vec![R::Scalar::infinity(); length];
    let mut max = vec![R::Scalar::neg_infinity(); length];

    for record in data.iter() {
        for (index, &x) in record.vector().iter().enumerate() {
            if allowed(mask, x, index) {
                min[index] = min[index].min(x);
                max[index] = max[index].max(x);
            }
        }
    }

    let range: Vec<R::Scalar> = min.iter().zip(max.iter()).map(|(&lo, &hi)| hi - lo).collect();
    for record in data.records_mut() {
        for (index, x) in record.vector_mut().iter_mut().enumerate() {
            let width = range[index];
            // Also rejects dimensions that never saw a value (inf - inf is NaN).
            if !(width > R::Scalar::zero()) || !width.is_finite() {
                continue;
            }
            if allowed(mask, *x, index) {
                *x = (*x - min[index]) / width;
            }
        }
    }
    debug!("Normalized {} records over {} dimensions", data.len(), length);
}

/// Lays the records out on an evenly spaced grid inside the unit hypercube, then applies
/// `x * scale[k] + shift[k]` on every dimension `k`.
///
/// Positions advance along dimension 0 by `1 / n^(1/length)` and carry into the next dimension
/// when they reach the end of the cube, like an odometer.
pub fn distribute_data<R: VectorRecord>(
    data: &mut DataSet<R>,
    scale: &[R::Scalar],
    shift: &[R::Scalar],
) -> LearningResult<()> {
    let length = data.input_vector_length();
    LearningError::check_dimension(length, scale.len())?;
    LearningError::check_dimension(length, shift.len())?;
    if data.is_empty() || length == 0 {
        return Ok(());
    }

    let one = R::Scalar::one();
    let half: R::Scalar = cast(0.5);
    let count: R::Scalar = cast(data.len() as f64);
    let chunk_size = count.powf(one / cast(length as f64));
    let step = one / chunk_size;

    let mut position = vec![R::Scalar::zero(); length];
    for record in data.records_mut() {
        record.vector_mut().copy_from_slice(&position);
        position[0] = position[0] + step;
        for k in 0..length {
            if position[k] >= one - step * half {
                position[k] = R::Scalar::zero();
                if k + 1 >= length {
                    break;
                }
                position[k + 1] = position[k + 1] + step;
            }
        }
    }

    normalize_coordinates(data, None);
    for record in data.records_mut() {
        for ((x, &s), &t) in record.vector_mut().iter_mut().zip(scale).zip(shift) {
            *x = *x * s + t;
        }
    }
    debug!("Distributed {} records on a grid with step {:?}", data.len(), step);
    Ok(())
}

/// Creates `size` records of the given length spread evenly over the scaled and shifted unit
/// hypercube. Useful as the set of points a model is rendered or sampled on.
pub fn approximation_set<R: VectorRecord>(
    size: usize,
    length: usize,
    scale: &[R::Scalar],
    shift: &[R::Scalar],
) -> LearningResult<DataSet<R>> {
    let mut data = DataSet::with_capacity(length, size);
    for _ in 0..size {
        data.push(R::from_vector(vec![cast(0.5); length]))?;
    }
    distribute_data(&mut data, scale, shift)?;
    Ok(data)
}
