use std::fmt::Debug;

use ndarray::{s, Array1, Array2, Array3, ArrayBase, ArrayD, ArrayView3, Axis, Data, Dimension, IxDyn};
use num_traits::Float;

use crate::error::{InvalidRotationKind, LieError};

/// Floating point element type accepted by the conversions.
///
/// Carries the tolerances used by the validity and singularity checks.
pub trait LieScalar: Float + ndarray::ScalarOperand + Debug + Send + Sync + 'static {
    /// Decimal resolution of the type, used as absolute tolerance.
    const RESOLUTION: Self;

    /// Relative tolerance of the closeness checks.
    const RELATIVE_TOLERANCE: Self;

    /// Convert a literal into the element type.
    fn from_literal(value: f64) -> Self;
}

impl LieScalar for f32 {
    const RESOLUTION: f32 = 1e-6;
    const RELATIVE_TOLERANCE: f32 = 1e-5;

    fn from_literal(value: f64) -> Self {
        value as f32
    }
}

impl LieScalar for f64 {
    const RESOLUTION: f64 = 1e-15;
    const RELATIVE_TOLERANCE: f64 = 1e-5;

    fn from_literal(value: f64) -> Self {
        value
    }
}

#[inline]
pub(crate) fn is_close<T: LieScalar>(a: T, b: T) -> bool {
    (a - b).abs() <= T::RESOLUTION + T::RELATIVE_TOLERANCE * b.abs()
}

/// Collapse the leading dimensions of a batch of matrices.
///
/// Returns the batch shape and a `(batch, rows, cols)` copy of the data. The trailing
/// dimensions must be one of 3x3, 3x4 or 4x4.
pub(crate) fn flatten_matrices<T, S, D>(
    mat: &ArrayBase<S, D>,
) -> Result<(Vec<usize>, Array3<T>), LieError>
where
    T: LieScalar,
    S: Data<Elem = T>,
    D: Dimension,
{
    let shape = mat.shape();
    if shape.len() < 2 {
        return Err(LieError::Shape(format!(
            "input must have at least 2 dimensions, got {:?}",
            shape
        )));
    }

    let (batch, tail) = shape.split_at(shape.len() - 2);
    if !matches!(tail, [3, 3] | [3, 4] | [4, 4]) {
        return Err(LieError::Shape(format!(
            "input must be a (*, 3, 3), (*, 3, 4) or (*, 4, 4) array, got {:?}",
            shape
        )));
    }

    let count = batch.iter().product::<usize>();
    let flat = Array3::from_shape_vec((count, tail[0], tail[1]), mat.iter().cloned().collect())?;

    Ok((batch.to_vec(), flat))
}

/// Collapse the leading dimensions of a batch of vectors of length `len`.
pub(crate) fn flatten_vectors<T, S, D>(
    arr: &ArrayBase<S, D>,
    len: usize,
) -> Result<(Vec<usize>, Array2<T>), LieError>
where
    T: LieScalar,
    S: Data<Elem = T>,
    D: Dimension,
{
    let shape = arr.shape();
    match shape.last() {
        Some(&last) if last == len => {}
        _ => {
            return Err(LieError::Shape(format!(
                "input must be a (*, {}) array, got {:?}",
                len, shape
            )))
        }
    }

    let batch = &shape[..shape.len() - 1];
    let count = batch.iter().product::<usize>();
    let flat = Array2::from_shape_vec((count, len), arr.iter().cloned().collect())?;

    Ok((batch.to_vec(), flat))
}

/// Restore the batch dimensions of a flattened `(batch, ...)` array.
pub(crate) fn unflatten<T, S, D>(flat: &ArrayBase<S, D>, batch: &[usize]) -> Result<ArrayD<T>, LieError>
where
    T: LieScalar,
    S: Data<Elem = T>,
    D: Dimension,
{
    let mut shape = batch.to_vec();
    shape.extend_from_slice(&flat.shape()[1..]);
    Ok(ArrayD::from_shape_vec(
        IxDyn(&shape),
        flat.iter().cloned().collect(),
    )?)
}

/// Determinant of every 3x3 block in a `(batch, >=3, >=3)` array.
pub(crate) fn det3<T: LieScalar>(m: ArrayView3<'_, T>) -> Array1<T> {
    let e = |i: usize, j: usize| m.slice_move(s![.., i, j]);

    &e(0, 0) * &(&e(1, 1) * &e(2, 2) - &e(1, 2) * &e(2, 1))
        - &e(0, 1) * &(&e(1, 0) * &e(2, 2) - &e(1, 2) * &e(2, 0))
        + &e(0, 2) * &(&e(1, 0) * &e(2, 1) - &e(1, 1) * &e(2, 0))
}

/// Verify that every 3x3 block is orthogonal with a unit determinant.
pub(crate) fn check_rotation<T: LieScalar>(rot: ArrayView3<'_, T>) -> Result<(), LieError> {
    for i in 0..3 {
        for j in 0..3 {
            // (R R^T)_ij over the whole batch
            let entry = (&rot.slice(s![.., i, ..3]) * &rot.slice(s![.., j, ..3])).sum_axis(Axis(1));
            let target = if i == j { T::one() } else { T::zero() };
            if !entry.iter().all(|&v| is_close(v, target)) {
                return Err(LieError::InvalidRotation(
                    InvalidRotationKind::NotOrthogonal,
                ));
            }
        }
    }

    if !det3(rot).iter().all(|&d| is_close(d, T::one())) {
        return Err(LieError::InvalidRotation(InvalidRotationKind::Determinant));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array4};

    #[test]
    fn test_flatten_matrices_keeps_batch_order() -> Result<(), LieError> {
        let mat = Array4::<f64>::from_shape_fn((2, 3, 4, 4), |(a, b, i, j)| {
            (a * 100 + b * 10 + i * 4 + j) as f64
        });
        let (batch, flat) = flatten_matrices(&mat)?;
        assert_eq!(batch, vec![2, 3]);
        assert_eq!(flat.shape(), &[6, 4, 4]);
        assert_eq!(flat[[4, 1, 2]], 116.0);
        Ok(())
    }

    #[test]
    fn test_flatten_matrices_rejects_bad_shapes() {
        let vector = Array1::<f32>::zeros(9);
        assert!(matches!(flatten_matrices(&vector), Err(LieError::Shape(_))));

        let wide = Array2::<f32>::zeros((4, 3));
        assert!(matches!(flatten_matrices(&wide), Err(LieError::Shape(_))));
    }

    #[test]
    fn test_det3() {
        let m = array![
            [[2.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 4.0]],
            [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
        ];
        let det = det3(m.view());
        assert_eq!(det.to_vec(), vec![24.0, 1.0]);
    }

    #[test]
    fn test_check_rotation() {
        let rot = array![[[0.0f64, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]];
        assert!(check_rotation(rot.view()).is_ok());

        let skewed = array![[[1.0f64, 0.1, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]];
        assert_eq!(
            check_rotation(skewed.view()),
            Err(LieError::InvalidRotation(InvalidRotationKind::NotOrthogonal))
        );

        let reflection = array![[[1.0f64, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]]];
        assert_eq!(
            check_rotation(reflection.view()),
            Err(LieError::InvalidRotation(InvalidRotationKind::Determinant))
        );
    }
}
