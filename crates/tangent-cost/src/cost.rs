use ndarray::{Array1, ArrayView2};
use tangent_autodiff::{DualNum, Scalar};

use crate::{error::CostError, quadratic::QuadraticTerms};

/// A stage cost `c(x, u)` of a dynamical system.
///
/// Implementors write the cost once against [`DualNum`]; the
/// [`CostLinearizer`](crate::CostLinearizer) evaluates it on plain floats and on dual
/// numbers to obtain its derivatives.
///
/// # Example
///
/// ```
/// use ndarray::{Array1, ArrayView2, Axis};
/// use tangent_autodiff::{DualNum, Scalar};
/// use tangent_cost::Cost;
///
/// /// Squared distance of the state to the origin.
/// struct Distance;
///
/// impl<F: Scalar> Cost<F> for Distance {
///     fn cost<D: DualNum<F> + Copy>(&self, state: ArrayView2<D>, _input: ArrayView2<D>) -> Array1<D> {
///         state.mapv(|v| v * v).sum_axis(Axis(1))
///     }
/// }
/// ```
pub trait Cost<F: Scalar>: Sync {
    /// Evaluate the cost of every row of a batch.
    ///
    /// # Arguments
    ///
    /// * `state` - The states with shape `(batch, n)`.
    /// * `input` - The inputs with shape `(batch, m)`.
    ///
    /// # Returns
    ///
    /// One cost value per batch row. Row `b` may only depend on row `b` of the arguments.
    fn cost<D: DualNum<F> + Copy>(
        &self,
        state: ArrayView2<'_, D>,
        input: ArrayView2<'_, D>,
    ) -> Array1<D>;

    /// Check that the cost can be evaluated on `batch` states of size `n` and inputs of
    /// size `m`.
    ///
    /// Costs with fixed sizes override this so the linearizer rejects arguments that
    /// [`cost`](Self::cost) cannot handle.
    fn check_shapes(&self, _batch: usize, _n: usize, _m: usize) -> Result<(), CostError> {
        Ok(())
    }

    /// Exact second-order terms, when the cost has a closed form for them.
    ///
    /// The linearizer returns these instead of differentiating the cost.
    fn closed_form(&self) -> Option<&QuadraticTerms<F>> {
        None
    }
}
