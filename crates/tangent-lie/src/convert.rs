use ndarray::{concatenate, s, stack, Array1, Array2, Array3, ArrayBase, ArrayView3, Axis, Data, Dimension, Zip};

use crate::{
    error::LieError,
    lietensor::LieTensor,
    ltype::LieType,
    ops::{check_rotation, det3, flatten_matrices, unflatten, LieScalar},
};

/// Quaternions of a `(batch, 3, 3)` array of rotations with Shepperd's method.
///
/// All four candidate quaternions are computed for the whole batch and the stable one is
/// picked per entry with mutually exclusive masks, so the extraction never branches on the
/// data. Returns a `(batch, 4)` array in `[x, y, z, w]` order.
fn shepperd<T: LieScalar>(rot: ArrayView3<'_, T>) -> Result<Array2<T>, LieError> {
    // entry (i, j) of the transposed rotation
    let r = |i: usize, j: usize| rot.slice_move(s![.., j, i]);
    let one = T::one();
    let zero = T::zero();

    let mask_d2 = r(2, 2).mapv(|v| v < T::RESOLUTION);
    let mask_d0_d1 = Zip::from(r(0, 0))
        .and(r(1, 1))
        .map_collect(|&d0, &d1| d0 > d1);
    let mask_d0_nd1 = Zip::from(r(0, 0))
        .and(r(1, 1))
        .map_collect(|&d0, &d1| d0 < -d1);

    let t0 = &r(0, 0) - &r(1, 1) - &r(2, 2) + one;
    let q0 = stack(
        Axis(1),
        &[
            (&r(1, 2) - &r(2, 1)).view(),
            t0.view(),
            (&r(0, 1) + &r(1, 0)).view(),
            (&r(2, 0) + &r(0, 2)).view(),
        ],
    )?;

    let t1 = &r(1, 1) - &r(0, 0) - &r(2, 2) + one;
    let q1 = stack(
        Axis(1),
        &[
            (&r(2, 0) - &r(0, 2)).view(),
            (&r(0, 1) + &r(1, 0)).view(),
            t1.view(),
            (&r(1, 2) + &r(2, 1)).view(),
        ],
    )?;

    let t2 = &r(2, 2) - &r(0, 0) - &r(1, 1) + one;
    let q2 = stack(
        Axis(1),
        &[
            (&r(0, 1) - &r(1, 0)).view(),
            (&r(2, 0) + &r(0, 2)).view(),
            (&r(1, 2) + &r(2, 1)).view(),
            t2.view(),
        ],
    )?;

    let t3 = &r(0, 0) + &r(1, 1) + &r(2, 2) + one;
    let q3 = stack(
        Axis(1),
        &[
            t3.view(),
            (&r(1, 2) - &r(2, 1)).view(),
            (&r(2, 0) - &r(0, 2)).view(),
            (&r(0, 1) - &r(1, 0)).view(),
        ],
    )?;

    let weight = |a: &Array1<bool>, b: &Array1<bool>, negate_b: bool| -> Array1<T> {
        Zip::from(a)
            .and(b)
            .map_collect(|&a, &b| if a && (b != negate_b) { one } else { zero })
    };
    let not_d2 = mask_d2.mapv(|m| !m);
    let c0 = weight(&mask_d2, &mask_d0_d1, false);
    let c1 = weight(&mask_d2, &mask_d0_d1, true);
    let c2 = weight(&not_d2, &mask_d0_nd1, false);
    let c3 = weight(&not_d2, &mask_d0_nd1, true);

    let column = |c: &Array1<T>| c.view().insert_axis(Axis(1)).to_owned();
    let q = q0 * &column(&c0) + q1 * &column(&c1) + q2 * &column(&c2) + q3 * &column(&c3);
    let trace = t0 * &c0 + t1 * &c1 + t2 * &c2 + t3 * &c3;
    let norm = trace.mapv(|t| t.sqrt() * (one + one)).insert_axis(Axis(1));

    // wxyz -> xyzw
    Ok((q / &norm).select(Axis(1), &[1, 2, 3, 0]))
}

/// Scale factors `det(U)^(1/3)` of the upper-left blocks `U` of a flattened batch.
fn extract_scale<T: LieScalar>(flat: &Array3<T>) -> Result<Array1<T>, LieError> {
    let third = T::from_literal(1.0 / 3.0);
    let scale = det3(flat.view()).mapv(|d| d.powf(third));

    if scale.iter().any(|s| s.abs() <= T::RESOLUTION) {
        return Err(LieError::SingularScale);
    }

    Ok(scale)
}

/// Upper-left 3x3 blocks divided by their scale factors.
fn unit_rotation<T: LieScalar>(flat: &Array3<T>, scale: &Array1<T>) -> Array3<T> {
    let scale = scale.view().insert_axis(Axis(1)).insert_axis(Axis(2));
    &flat.slice(s![.., ..3, ..3]) / &scale
}

/// Translation column of a flattened batch, zero when the matrices are 3x3.
fn translation<T: LieScalar>(flat: &Array3<T>) -> Array2<T> {
    if flat.shape()[2] == 4 {
        flat.slice(s![.., ..3, 3]).to_owned()
    } else {
        Array2::zeros((flat.shape()[0], 3))
    }
}

/// Quaternions of the upper-left blocks of a flattened batch, optionally validated.
fn quaternions<T: LieScalar>(rot: ArrayView3<'_, T>, check: bool) -> Result<Array2<T>, LieError> {
    let rot = rot.slice_move(s![.., ..3, ..3]);
    if check {
        check_rotation(rot)?;
    }
    shepperd(rot)
}

/// Convert batched rotation or transformation matrices to SO3 quaternions.
///
/// Only the upper-left 3x3 block of each matrix is used.
///
/// # Arguments
///
/// * `mat` - Matrices with shape `(*, 3, 3)`, `(*, 3, 4)` or `(*, 4, 4)`.
/// * `check` - Verify that the blocks are orthogonal with a unit determinant. Without the
///   check an invalid rotation yields meaningless values, likely NaN.
///
/// # Returns
///
/// A [`LieType::SO3`] tensor of shape `(*, 4)` holding `[qx, qy, qz, qw]`.
///
/// # Errors
///
/// * [`LieError::Shape`] if the input is not a batch of 3x3, 3x4 or 4x4 matrices.
/// * [`LieError::InvalidRotation`] if `check` is set and a block is not a rotation.
///
/// Example:
///
/// ```
/// use ndarray::array;
/// use tangent_lie::matrix_to_quaternion;
///
/// let rot = array![[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
/// let so3 = matrix_to_quaternion(&rot, true).unwrap();
/// let q = so3.tensor();
/// assert!((q[2] - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
/// assert!((q[3] - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
/// ```
pub fn matrix_to_quaternion<T, S, D>(
    mat: &ArrayBase<S, D>,
    check: bool,
) -> Result<LieTensor<T>, LieError>
where
    T: LieScalar,
    S: Data<Elem = T>,
    D: Dimension,
{
    let (batch, flat) = flatten_matrices(mat)?;
    let q = quaternions(flat.view(), check)?;
    LieTensor::new(LieType::SO3, unflatten(&q, &batch)?)
}

/// Convert batched rotation or transformation matrices to SE3 rigid transforms.
///
/// The translation is the last column of 3x4 and 4x4 inputs and zero for 3x3 inputs.
///
/// # Returns
///
/// A [`LieType::SE3`] tensor of shape `(*, 7)` holding `[tx, ty, tz, qx, qy, qz, qw]`.
///
/// # Errors
///
/// Same as [`matrix_to_quaternion`].
pub fn matrix_to_rigid<T, S, D>(mat: &ArrayBase<S, D>, check: bool) -> Result<LieTensor<T>, LieError>
where
    T: LieScalar,
    S: Data<Elem = T>,
    D: Dimension,
{
    let (batch, flat) = flatten_matrices(mat)?;
    let q = quaternions(flat.view(), check)?;
    let t = translation(&flat);

    let vec = concatenate(Axis(1), &[t.view(), q.view()])?;
    LieTensor::new(LieType::SE3, unflatten(&vec, &batch)?)
}

/// Convert batched scaled transformation matrices to Sim3 similarity transforms.
///
/// The scale is the cube root of the determinant of the upper-left 3x3 block `U`, and the
/// quaternion is extracted from `U / s`. The translation follows [`matrix_to_rigid`].
///
/// # Returns
///
/// A [`LieType::Sim3`] tensor of shape `(*, 8)` holding `[tx, ty, tz, qx, qy, qz, qw, s]`.
///
/// # Errors
///
/// * [`LieError::SingularScale`] if the scale of any batch entry is zero.
/// * Otherwise the same as [`matrix_to_quaternion`].
///
/// Example:
///
/// ```
/// use ndarray::array;
/// use tangent_lie::matrix_to_similarity;
///
/// let mat = array![
///     [0.0f64, -0.5, 0.0, 0.1],
///     [0.5, 0.0, 0.0, 0.2],
///     [0.0, 0.0, 0.5, 0.3],
///     [0.0, 0.0, 0.0, 1.0],
/// ];
/// let sim3 = matrix_to_similarity(&mat, false).unwrap();
/// assert!((sim3.tensor()[7] - 0.5).abs() < 1e-12);
/// ```
pub fn matrix_to_similarity<T, S, D>(
    mat: &ArrayBase<S, D>,
    check: bool,
) -> Result<LieTensor<T>, LieError>
where
    T: LieScalar,
    S: Data<Elem = T>,
    D: Dimension,
{
    let (batch, flat) = flatten_matrices(mat)?;
    let scale = extract_scale(&flat)?;
    let q = quaternions(unit_rotation(&flat, &scale).view(), check)?;
    let t = translation(&flat);

    let s = scale.insert_axis(Axis(1));
    let vec = concatenate(Axis(1), &[t.view(), q.view(), s.view()])?;
    LieTensor::new(LieType::Sim3, unflatten(&vec, &batch)?)
}

/// Convert batched scaled rotation matrices to RxSO3 scaled rotations.
///
/// Same scale extraction as [`matrix_to_similarity`], without translation.
///
/// # Returns
///
/// A [`LieType::RxSO3`] tensor of shape `(*, 5)` holding `[qx, qy, qz, qw, s]`.
///
/// # Errors
///
/// Same as [`matrix_to_similarity`].
pub fn matrix_to_scaled_rotation<T, S, D>(
    mat: &ArrayBase<S, D>,
    check: bool,
) -> Result<LieTensor<T>, LieError>
where
    T: LieScalar,
    S: Data<Elem = T>,
    D: Dimension,
{
    let (batch, flat) = flatten_matrices(mat)?;
    let scale = extract_scale(&flat)?;
    let q = quaternions(unit_rotation(&flat, &scale).view(), check)?;

    let s = scale.insert_axis(Axis(1));
    let vec = concatenate(Axis(1), &[q.view(), s.view()])?;
    LieTensor::new(LieType::RxSO3, unflatten(&vec, &batch)?)
}

/// Convert batched matrices to a Lie tensor of the requested group type.
///
/// # Arguments
///
/// * `mat` - Matrices with shape `(*, 3, 3)`, `(*, 3, 4)` or `(*, 4, 4)`.
/// * `ltype` - One of [`LieType::SO3`], [`LieType::SE3`], [`LieType::Sim3`] or
///   [`LieType::RxSO3`].
/// * `check` - Verify the rotation blocks, see [`matrix_to_quaternion`].
///
/// # Errors
///
/// * [`LieError::UnsupportedVariant`] for the Lie algebra types.
/// * Otherwise the errors of the selected conversion.
pub fn from_matrix<T, S, D>(
    mat: &ArrayBase<S, D>,
    ltype: LieType,
    check: bool,
) -> Result<LieTensor<T>, LieError>
where
    T: LieScalar,
    S: Data<Elem = T>,
    D: Dimension,
{
    if !ltype.is_group() {
        return Err(LieError::UnsupportedVariant(format!(
            "{} has no matrix conversion, expected one of SO3, SE3, Sim3 or RxSO3",
            ltype
        )));
    }

    match ltype {
        LieType::SO3 => matrix_to_quaternion(mat, check),
        LieType::SE3 => matrix_to_rigid(mat, check),
        LieType::Sim3 => matrix_to_similarity(mat, check),
        _ => matrix_to_scaled_rotation(mat, check),
    }
}
