use ndarray::{s, Array1, Array3, ArrayBase, ArrayD, ArrayView1, ArrayView2, Axis, Data, Dimension};

use crate::{
    error::LieError,
    lietensor::LieTensor,
    ltype::LieType,
    ops::{flatten_vectors, unflatten, LieScalar},
};

/// Rotation matrices of a `(batch, 4)` array of `[x, y, z, w]` quaternions.
///
/// The quaternions are normalized first, so a scaled quaternion yields a pure rotation.
pub(crate) fn rotation_matrices<T: LieScalar>(q: ArrayView2<'_, T>) -> Array3<T> {
    let norm = q
        .mapv(|v| v * v)
        .sum_axis(Axis(1))
        .mapv(T::sqrt)
        .insert_axis(Axis(1));
    let q = &q / &norm;

    let (x, y, z, w) = (q.column(0), q.column(1), q.column(2), q.column(3));
    let prod = |a: &ArrayView1<T>, b: &ArrayView1<T>| -> Array1<T> { a * b };

    let one = T::one();
    let two = T::from_literal(2.0);

    let entries = [
        (prod(&y, &y) + prod(&z, &z)) * -two + one,
        (prod(&x, &y) - prod(&z, &w)) * two,
        (prod(&x, &z) + prod(&y, &w)) * two,
        (prod(&x, &y) + prod(&z, &w)) * two,
        (prod(&x, &x) + prod(&z, &z)) * -two + one,
        (prod(&y, &z) - prod(&x, &w)) * two,
        (prod(&x, &z) - prod(&y, &w)) * two,
        (prod(&y, &z) + prod(&x, &w)) * two,
        (prod(&x, &x) + prod(&y, &y)) * -two + one,
    ];

    Array3::from_shape_fn((q.nrows(), 3, 3), |(b, i, j)| entries[i * 3 + j][b])
}

/// Multiply every matrix of the batch by its own scale factor.
fn scaled<T: LieScalar>(linear: Array3<T>, scale: ArrayView1<'_, T>) -> Array3<T> {
    linear * &scale.insert_axis(Axis(1)).insert_axis(Axis(2))
}

/// Stack `[[A, t], [0, 1]]` for every batch entry.
fn homogeneous<T: LieScalar>(linear: Array3<T>, translation: ArrayView2<'_, T>) -> Array3<T> {
    let mut out = Array3::zeros((linear.shape()[0], 4, 4));
    out.slice_mut(s![.., ..3, ..3]).assign(&linear);
    out.slice_mut(s![.., ..3, 3]).assign(&translation);
    out.slice_mut(s![.., 3, 3]).fill(T::one());
    out
}

/// Convert batched quaternions to rotation matrices.
///
/// # Arguments
///
/// * `quaternion` - Array of shape `(*, 4)` in `[x, y, z, w]` order.
///
/// # Returns
///
/// The rotation matrices with shape `(*, 3, 3)`.
///
/// # Errors
///
/// Returns [`LieError::Shape`] if the trailing dimension is not 4.
///
/// Example:
///
/// ```
/// use ndarray::array;
/// use tangent_lie::quaternion_to_matrix;
///
/// let half = std::f64::consts::FRAC_1_SQRT_2;
/// let rot = quaternion_to_matrix(&array![0.0, 0.0, half, half]).unwrap();
/// assert!((rot[[0, 1]] + 1.0).abs() < 1e-12);
/// assert!((rot[[1, 0]] - 1.0).abs() < 1e-12);
/// ```
pub fn quaternion_to_matrix<T, S, D>(quaternion: &ArrayBase<S, D>) -> Result<ArrayD<T>, LieError>
where
    T: LieScalar,
    S: Data<Elem = T>,
    D: Dimension,
{
    let (batch, flat) = flatten_vectors(quaternion, 4)?;
    unflatten(&rotation_matrices(flat.view()), &batch)
}

impl<T: LieScalar> LieTensor<T> {
    /// Matrix form of every element of the batch.
    ///
    /// | type | output |
    /// |---|---|
    /// | SO3 | `(*, 3, 3)` rotation `R` |
    /// | RxSO3 | `(*, 3, 3)` scaled rotation `sR` |
    /// | SE3 | `(*, 4, 4)` `[[R, t], [0, 1]]` |
    /// | Sim3 | `(*, 4, 4)` `[[sR, t], [0, 1]]` |
    ///
    /// # Errors
    ///
    /// Returns [`LieError::UnsupportedVariant`] for Lie algebra tensors.
    pub fn matrix(&self) -> Result<ArrayD<T>, LieError> {
        let ltype = self.ltype();
        let (batch, flat) = flatten_vectors(&self.tensor(), ltype.dimension())?;

        let out = match ltype {
            LieType::SO3 => rotation_matrices(flat.view()),
            LieType::RxSO3 => scaled(rotation_matrices(flat.slice(s![.., ..4])), flat.column(4)),
            LieType::SE3 => homogeneous(
                rotation_matrices(flat.slice(s![.., 3..7])),
                flat.slice(s![.., ..3]),
            ),
            LieType::Sim3 => homogeneous(
                scaled(rotation_matrices(flat.slice(s![.., 3..7])), flat.column(7)),
                flat.slice(s![.., ..3]),
            ),
            other => return Err(LieError::UnsupportedVariant(other.to_string())),
        };

        unflatten(&out, &batch)
    }
}
