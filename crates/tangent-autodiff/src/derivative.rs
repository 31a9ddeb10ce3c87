use ndarray::{
    s, stack, Array, Array1, Array2, Array3, ArrayBase, ArrayView2, Axis, Data, Dimension,
    LinalgScalar, ScalarOperand,
};
use num_dual::{Dual, DualNum, DualNumFloat, HyperDual};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AutodiffError;

/// Floating point type derivatives are computed in, `f32` or `f64`.
pub trait Scalar:
    DualNumFloat + DualNum<Self> + LinalgScalar + ScalarOperand + Send + Sync
{
}

impl<F> Scalar for F where
    F: DualNumFloat + DualNum<F> + LinalgScalar + ScalarOperand + Send + Sync
{
}

/// Embed plain values as constants of a dual number type.
pub fn lift<F, D, S, Dim>(array: &ArrayBase<S, Dim>) -> Array<D, Dim>
where
    F: Scalar,
    D: DualNum<F>,
    S: Data<Elem = F>,
    Dim: Dimension,
{
    array.mapv(|v| D::from(v))
}

/// Options controlling how derivatives are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivativeOptions {
    /// Run the forward passes, one per seeded coordinate, on the rayon thread pool.
    pub vectorize: bool,
}

impl Default for DerivativeOptions {
    fn default() -> Self {
        Self { vectorize: true }
    }
}

impl DerivativeOptions {
    /// Set whether the forward passes run in parallel.
    pub fn with_vectorize(mut self, vectorize: bool) -> Self {
        self.vectorize = vectorize;
        self
    }
}

fn forward_passes<R, P>(n: usize, vectorize: bool, pass: P) -> Result<Vec<R>, AutodiffError>
where
    R: Send,
    P: Fn(usize) -> Result<R, AutodiffError> + Sync,
{
    if vectorize {
        (0..n).into_par_iter().map(&pass).collect()
    } else {
        (0..n).map(pass).collect()
    }
}

#[inline]
fn unit<F: Scalar>(active: bool) -> F {
    if active {
        F::one()
    } else {
        F::zero()
    }
}

fn check_rows(expected: usize, actual: usize) -> Result<(), AutodiffError> {
    if expected != actual {
        return Err(AutodiffError::OutputShape { expected, actual });
    }
    Ok(())
}

/// Per-row gradients of a scalar function of a batch.
///
/// One forward pass is run per column of `points`, seeding that column in every row at
/// once.
///
/// # Arguments
///
/// * `f` - Function from `(batch, n)` inputs to one value per row. Row `b` of the output
///   may only depend on row `b` of the input.
/// * `points` - The points of shape `(batch, n)`.
/// * `options` - Evaluation options.
///
/// # Returns
///
/// The gradients with shape `(batch, n)`.
///
/// # Errors
///
/// * [`AutodiffError::EmptyInput`] if the points have no columns.
/// * [`AutodiffError::OutputShape`] if `f` does not return one value per row.
pub fn batch_gradient<F, G>(
    f: G,
    points: ArrayView2<'_, F>,
    options: &DerivativeOptions,
) -> Result<Array2<F>, AutodiffError>
where
    F: Scalar,
    G: Fn(ArrayView2<'_, Dual<F, F>>) -> Array1<Dual<F, F>> + Sync,
{
    let (batch, n) = points.dim();
    if n == 0 {
        return Err(AutodiffError::EmptyInput);
    }

    let columns = forward_passes(n, options.vectorize, |j| {
        log::trace!("gradient pass {}/{} over {} rows", j + 1, n, batch);
        let seeded =
            Array2::from_shape_fn((batch, n), |(b, k)| Dual::new(points[[b, k]], unit(k == j)));
        let out = f(seeded.view());
        check_rows(batch, out.len())?;
        Ok(out.mapv(|d| d.eps))
    })?;

    let views = columns.iter().map(|c| c.view()).collect::<Vec<_>>();
    Ok(stack(Axis(1), &views)?)
}

/// Per-row Jacobians of a vector function of a batch.
///
/// Equivalent to the diagonal blocks of the full `(batch * m, batch * n)` Jacobian, but
/// computed with only `n` forward passes.
///
/// # Arguments
///
/// * `f` - Function from `(batch, n)` inputs to `(batch, m)` outputs, rows independent.
/// * `points` - The points of shape `(batch, n)`.
/// * `options` - Evaluation options.
///
/// # Returns
///
/// The Jacobians with shape `(batch, m, n)`, i.e. `jac[[b, i, j]] = d f_bi / d x_bj`.
///
/// # Errors
///
/// * [`AutodiffError::EmptyInput`] if the points have no columns.
/// * [`AutodiffError::OutputShape`] if `f` does not keep the batch size or changes its
///   output width between passes.
///
/// Example:
///
/// ```
/// use ndarray::{array, Array2};
/// use tangent_autodiff::{batch_jacobian, DerivativeOptions};
///
/// let points = array![[1.0, 2.0]];
/// let jac = batch_jacobian(
///     |x| Array2::from_shape_fn((x.nrows(), 2), |(b, i)| match i {
///         0 => x[[b, 0]] * x[[b, 1]],
///         _ => x[[b, 0]] + x[[b, 1]],
///     }),
///     points.view(),
///     &DerivativeOptions::default(),
/// )
/// .unwrap();
/// assert_eq!(jac, array![[[2.0, 1.0], [1.0, 1.0]]]);
/// ```
pub fn batch_jacobian<F, G>(
    f: G,
    points: ArrayView2<'_, F>,
    options: &DerivativeOptions,
) -> Result<Array3<F>, AutodiffError>
where
    F: Scalar,
    G: Fn(ArrayView2<'_, Dual<F, F>>) -> Array2<Dual<F, F>> + Sync,
{
    let (batch, n) = points.dim();
    if n == 0 {
        return Err(AutodiffError::EmptyInput);
    }

    let columns = forward_passes(n, options.vectorize, |j| {
        log::trace!("jacobian pass {}/{} over {} rows", j + 1, n, batch);
        let seeded =
            Array2::from_shape_fn((batch, n), |(b, k)| Dual::new(points[[b, k]], unit(k == j)));
        let out = f(seeded.view());
        check_rows(batch, out.nrows())?;
        Ok(out.mapv(|d| d.eps))
    })?;

    let m = columns[0].ncols();
    if let Some(bad) = columns.iter().find(|c| c.ncols() != m) {
        return Err(AutodiffError::OutputShape {
            expected: m,
            actual: bad.ncols(),
        });
    }

    let views = columns.iter().map(|c| c.view()).collect::<Vec<_>>();
    Ok(stack(Axis(2), &views)?)
}

/// Per-row Hessians of a scalar function of a batch.
///
/// Each entry of the upper triangle is one forward pass on hyper-dual numbers; the lower
/// triangle is mirrored.
///
/// # Returns
///
/// The Hessians with shape `(batch, n, n)`.
///
/// # Errors
///
/// Same as [`batch_gradient`].
pub fn batch_hessian<F, G>(
    f: G,
    points: ArrayView2<'_, F>,
    options: &DerivativeOptions,
) -> Result<Array3<F>, AutodiffError>
where
    F: Scalar,
    G: Fn(ArrayView2<'_, HyperDual<F, F>>) -> Array1<HyperDual<F, F>> + Sync,
{
    let (batch, n) = points.dim();
    if n == 0 {
        return Err(AutodiffError::EmptyInput);
    }

    let pairs = (0..n)
        .flat_map(|i| (i..n).map(move |j| (i, j)))
        .collect::<Vec<_>>();

    let entries = forward_passes(pairs.len(), options.vectorize, |p| {
        let (i, j) = pairs[p];
        log::trace!("hessian pass ({}, {}) over {} rows", i, j, batch);
        let seeded = Array2::from_shape_fn((batch, n), |(b, k)| {
            HyperDual::new(points[[b, k]], unit(k == i), unit(k == j), F::zero())
        });
        let out = f(seeded.view());
        check_rows(batch, out.len())?;
        Ok(out.mapv(|d| d.eps1eps2))
    })?;

    let mut hessian = Array3::zeros((batch, n, n));
    for (&(i, j), entry) in pairs.iter().zip(&entries) {
        hessian.slice_mut(s![.., i, j]).assign(entry);
        hessian.slice_mut(s![.., j, i]).assign(entry);
    }
    Ok(hessian)
}

/// Per-row mixed second derivatives of a scalar function of two batches.
///
/// # Arguments
///
/// * `f` - Function of `(batch, n)` and `(batch, m)` inputs with one value per row.
/// * `x` - The first argument, `(batch, n)`.
/// * `y` - The second argument, `(batch, m)`.
/// * `options` - Evaluation options.
///
/// # Returns
///
/// `d^2 f / dx_i dy_j` with shape `(batch, n, m)`.
///
/// # Errors
///
/// * [`AutodiffError::BatchMismatch`] if the arguments have different batch sizes.
/// * Otherwise the errors of [`batch_gradient`].
pub fn batch_partial_hessian<F, G>(
    f: G,
    x: ArrayView2<'_, F>,
    y: ArrayView2<'_, F>,
    options: &DerivativeOptions,
) -> Result<Array3<F>, AutodiffError>
where
    F: Scalar,
    G: Fn(ArrayView2<'_, HyperDual<F, F>>, ArrayView2<'_, HyperDual<F, F>>) -> Array1<HyperDual<F, F>>
        + Sync,
{
    let (batch, n) = x.dim();
    let (other, m) = y.dim();
    if batch != other {
        return Err(AutodiffError::BatchMismatch {
            left: batch,
            right: other,
        });
    }
    if n == 0 || m == 0 {
        return Err(AutodiffError::EmptyInput);
    }

    let entries = forward_passes(n * m, options.vectorize, |p| {
        let (i, j) = (p / m, p % m);
        log::trace!("partial hessian pass ({}, {}) over {} rows", i, j, batch);
        let sx = Array2::from_shape_fn((batch, n), |(b, k)| {
            HyperDual::new(x[[b, k]], unit(k == i), F::zero(), F::zero())
        });
        let sy = Array2::from_shape_fn((batch, m), |(b, k)| {
            HyperDual::new(y[[b, k]], F::zero(), unit(k == j), F::zero())
        });
        let out = f(sx.view(), sy.view());
        check_rows(batch, out.len())?;
        Ok(out.mapv(|d| d.eps1eps2))
    })?;

    let mut cross = Array3::zeros((batch, n, m));
    for (p, entry) in entries.iter().enumerate() {
        cross.slice_mut(s![.., p / m, p % m]).assign(entry);
    }
    Ok(cross)
}
