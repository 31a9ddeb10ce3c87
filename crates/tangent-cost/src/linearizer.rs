use log::debug;
use ndarray::{Array1, Array2, Array3, ArrayBase, ArrayViewD, Axis, Data, Dimension, Ix2};
use tangent_autodiff::{
    batch_gradient, batch_hessian, batch_partial_hessian, lift, DerivativeOptions, Dual,
    HyperDual, Scalar,
};

use crate::{cost::Cost, error::CostError, quadratic::QuadraticTerms};

/// The point a cost is expanded around.
#[derive(Debug, Clone)]
struct ReferencePoint<F> {
    state: Array2<F>,
    input: Array2<F>,
    value: Array1<F>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variable {
    State,
    Input,
}

/// Second-order Taylor expansion of a cost around a reference point.
///
/// For each batch row,
/// `c(x, u) ≈ 1/2 [x; u]^T [[cxx, cxu], [cux, cuu]] [x; u] + [cx, cu] [x; u] + c`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaylorExpansion<F> {
    /// Gradient on the state, `(batch, n)`.
    pub cx: Array2<F>,
    /// Gradient on the input, `(batch, m)`.
    pub cu: Array2<F>,
    /// Hessian on the state, `(batch, n, n)`.
    pub cxx: Array3<F>,
    /// Mixed second derivative, `(batch, n, m)`.
    pub cxu: Array3<F>,
    /// Mixed second derivative, `(batch, m, n)`.
    pub cux: Array3<F>,
    /// Hessian on the input, `(batch, m, m)`.
    pub cuu: Array3<F>,
    /// Constant term, `(batch,)`.
    pub c: Array1<F>,
    /// Cost at the reference point, `(batch,)`.
    pub value: Array1<F>,
}

/// Linearizes and quadraticizes a [`Cost`] around a reference point.
///
/// The derivative accessors fail with [`CostError::ReferenceNotSet`] until
/// [`set_reference_point`](Self::set_reference_point) is called. Every accessor recomputes
/// its result, nothing is cached besides the cost at the reference point.
///
/// # Example
///
/// ```
/// use ndarray::{array, Array1, ArrayView2, Axis};
/// use tangent_autodiff::{DualNum, Scalar};
/// use tangent_cost::{Cost, CostLinearizer};
///
/// struct Cubic;
///
/// impl<F: Scalar> Cost<F> for Cubic {
///     fn cost<D: DualNum<F> + Copy>(&self, state: ArrayView2<D>, input: ArrayView2<D>) -> Array1<D> {
///         state.mapv(|v| v.powi(3)).sum_axis(Axis(1)) + input.mapv(|v| v * v).sum_axis(Axis(1))
///     }
/// }
///
/// let mut linearizer = CostLinearizer::new(Cubic);
/// linearizer.evaluate(&array![1.0, 2.0], &array![3.0]).unwrap();
/// linearizer.set_reference_point(None, None).unwrap();
///
/// assert_eq!(linearizer.cx().unwrap(), array![[3.0, 12.0]]);
/// assert_eq!(linearizer.cuu().unwrap(), array![[[2.0]]]);
/// ```
#[derive(Debug, Clone)]
pub struct CostLinearizer<F, C> {
    cost: C,
    options: DerivativeOptions,
    recent: Option<(Array2<F>, Array2<F>)>,
    reference: Option<ReferencePoint<F>>,
}

/// View a 1-D or 2-D array as a batch of rows.
fn as_batch<F, S, D>(name: &str, array: &ArrayBase<S, D>) -> Result<Array2<F>, CostError>
where
    F: Scalar,
    S: Data<Elem = F>,
    D: Dimension,
{
    let array = array.view().into_dyn();
    let array = match array.ndim() {
        1 => array.insert_axis(Axis(0)),
        2 => array,
        n => {
            return Err(CostError::Shape(format!(
                "{} must be 1-D or 2-D, got {} dimensions",
                name, n
            )))
        }
    };

    array
        .into_dimensionality::<Ix2>()
        .map(|a| a.to_owned())
        .map_err(|e| CostError::Shape(format!("{}: {}", name, e)))
}

impl<F: Scalar, C: Cost<F>> CostLinearizer<F, C> {
    /// Wrap a cost with the default derivative options.
    pub fn new(cost: C) -> Self {
        Self {
            cost,
            options: DerivativeOptions::default(),
            recent: None,
            reference: None,
        }
    }

    /// Set the options of the derivative evaluations.
    pub fn with_options(mut self, options: DerivativeOptions) -> Self {
        self.options = options;
        self
    }

    /// The wrapped cost.
    pub fn cost(&self) -> &C {
        &self.cost
    }

    /// Mutable access to the wrapped cost.
    ///
    /// The cached cost at the reference point is not refreshed; set the reference point
    /// again after changing the cost.
    pub fn cost_mut(&mut self) -> &mut C {
        &mut self.cost
    }

    /// Consume the linearizer and return the wrapped cost.
    pub fn into_inner(self) -> C {
        self.cost
    }

    /// Check a pair of batches and evaluate the cost on them.
    fn checked_cost(&self, state: &Array2<F>, input: &Array2<F>) -> Result<Array1<F>, CostError> {
        let (batch, n) = state.dim();
        let (input_batch, m) = input.dim();
        if batch != input_batch {
            return Err(CostError::Shape(format!(
                "state and input batch sizes differ: {} and {}",
                batch, input_batch
            )));
        }
        self.cost.check_shapes(batch, n, m)?;
        if let Some(terms) = self.cost.closed_form() {
            terms.check(batch, n, m)?;
        }

        let value = self.cost.cost(state.view(), input.view());
        if value.len() != batch {
            return Err(CostError::Shape(format!(
                "cost returned {} values for a batch of {}",
                value.len(),
                batch
            )));
        }
        Ok(value)
    }

    /// Evaluate the cost and remember the arguments as the most recent ones.
    ///
    /// # Arguments
    ///
    /// * `state` - The state `(n,)` or the states `(batch, n)`.
    /// * `input` - The input `(m,)` or the inputs `(batch, m)`.
    ///
    /// # Returns
    ///
    /// The cost of every batch row. A single state and input give a batch of one.
    ///
    /// # Errors
    ///
    /// * [`CostError::Shape`] if an argument is not 1-D or 2-D, or the batch sizes differ.
    /// * [`CostError::DimensionMismatch`] if the cost cannot be evaluated on arguments of
    ///   these sizes.
    pub fn evaluate<S1, D1, S2, D2>(
        &mut self,
        state: &ArrayBase<S1, D1>,
        input: &ArrayBase<S2, D2>,
    ) -> Result<Array1<F>, CostError>
    where
        S1: Data<Elem = F>,
        D1: Dimension,
        S2: Data<Elem = F>,
        D2: Dimension,
    {
        let state = as_batch("state", state)?;
        let input = as_batch("input", input)?;
        let value = self.checked_cost(&state, &input)?;
        self.recent = Some((state, input));
        Ok(value)
    }

    /// Set the point the cost is expanded around.
    ///
    /// # Arguments
    ///
    /// * `state` - The reference state `(n,)` or states `(batch, n)`. `None` takes the most
    ///   recently evaluated states.
    /// * `input` - The reference input `(m,)` or inputs `(batch, m)`. `None` takes the most
    ///   recently evaluated inputs.
    ///
    /// # Errors
    ///
    /// * [`CostError::NoRecentInput`] if an argument is `None` and nothing was evaluated yet.
    /// * Otherwise the errors of [`evaluate`](Self::evaluate).
    pub fn set_reference_point(
        &mut self,
        state: Option<ArrayViewD<'_, F>>,
        input: Option<ArrayViewD<'_, F>>,
    ) -> Result<(), CostError> {
        let state = match state {
            Some(state) => as_batch("state", &state)?,
            None => self.recent.as_ref().ok_or(CostError::NoRecentInput)?.0.clone(),
        };
        let input = match input {
            Some(input) => as_batch("input", &input)?,
            None => self.recent.as_ref().ok_or(CostError::NoRecentInput)?.1.clone(),
        };

        let value = self.checked_cost(&state, &input)?;
        debug!(
            "reference point set for a batch of {} (state size {}, input size {})",
            state.nrows(),
            state.ncols(),
            input.ncols()
        );

        self.reference = Some(ReferencePoint {
            state,
            input,
            value,
        });
        Ok(())
    }

    fn reference(&self) -> Result<&ReferencePoint<F>, CostError> {
        self.reference.as_ref().ok_or(CostError::ReferenceNotSet)
    }

    /// The reference states, if set.
    pub fn reference_state(&self) -> Option<&Array2<F>> {
        self.reference.as_ref().map(|r| &r.state)
    }

    /// The reference inputs, if set.
    pub fn reference_input(&self) -> Option<&Array2<F>> {
        self.reference.as_ref().map(|r| &r.input)
    }

    /// The cost at the reference point, if set.
    pub fn reference_value(&self) -> Option<&Array1<F>> {
        self.reference.as_ref().map(|r| &r.value)
    }

    /// Gradient of the cost with respect to one variable.
    fn gradient(&self, variable: Variable) -> Result<Array2<F>, CostError> {
        let reference = self.reference()?;
        let grad = match variable {
            Variable::State => {
                let input: Array2<Dual<F, F>> = lift(&reference.input);
                batch_gradient(
                    |x| self.cost.cost(x, input.view()),
                    reference.state.view(),
                    &self.options,
                )?
            }
            Variable::Input => {
                let state: Array2<Dual<F, F>> = lift(&reference.state);
                batch_gradient(
                    |u| self.cost.cost(state.view(), u),
                    reference.input.view(),
                    &self.options,
                )?
            }
        };
        Ok(grad)
    }

    /// Second derivative `d/d first (d c / d second)` with shape `(batch, first, second)`.
    fn second_derivative(&self, first: Variable, second: Variable) -> Result<Array3<F>, CostError> {
        let reference = self.reference()?;
        let options = &self.options;
        let derivative = match (first, second) {
            (Variable::State, Variable::State) => {
                let input: Array2<HyperDual<F, F>> = lift(&reference.input);
                batch_hessian(
                    |x| self.cost.cost(x, input.view()),
                    reference.state.view(),
                    options,
                )?
            }
            (Variable::Input, Variable::Input) => {
                let state: Array2<HyperDual<F, F>> = lift(&reference.state);
                batch_hessian(
                    |u| self.cost.cost(state.view(), u),
                    reference.input.view(),
                    options,
                )?
            }
            (Variable::State, Variable::Input) => batch_partial_hessian(
                |x, u| self.cost.cost(x, u),
                reference.state.view(),
                reference.input.view(),
                options,
            )?,
            (Variable::Input, Variable::State) => batch_partial_hessian(
                |u, x| self.cost.cost(x, u),
                reference.input.view(),
                reference.state.view(),
                options,
            )?,
        };
        Ok(derivative)
    }

    /// Closed-form term broadcast to the reference batch, if the cost has one.
    fn closed_form_term(
        &self,
        name: &str,
        select: impl Fn(&QuadraticTerms<F>) -> &Array3<F>,
    ) -> Result<Option<Array3<F>>, CostError> {
        let Some(terms) = self.cost.closed_form() else {
            return Ok(None);
        };
        let batch = self.reference()?.state.nrows();
        let term = select(terms);
        let (_, rows, cols) = term.dim();

        debug!("{} taken from the closed-form terms", name);
        let broadcast = term.broadcast((batch, rows, cols)).ok_or_else(|| {
            CostError::DimensionMismatch(format!(
                "{} with shape {:?} cannot be broadcast to a batch of {}",
                name,
                term.dim(),
                batch
            ))
        })?;
        Ok(Some(broadcast.to_owned()))
    }

    fn second_order(
        &self,
        name: &str,
        first: Variable,
        second: Variable,
        select: impl Fn(&QuadraticTerms<F>) -> &Array3<F>,
    ) -> Result<Array3<F>, CostError> {
        match self.closed_form_term(name, select)? {
            Some(term) => Ok(term),
            None => {
                debug!("{} computed by differentiation", name);
                self.second_derivative(first, second)
            }
        }
    }

    /// Gradient of the cost with respect to the state at the reference point.
    ///
    /// # Returns
    ///
    /// The gradients with shape `(batch, n)`.
    ///
    /// # Errors
    ///
    /// Returns [`CostError::ReferenceNotSet`] if no reference point was set.
    pub fn cx(&self) -> Result<Array2<F>, CostError> {
        self.gradient(Variable::State)
    }

    /// Gradient of the cost with respect to the input at the reference point, `(batch, m)`.
    pub fn cu(&self) -> Result<Array2<F>, CostError> {
        self.gradient(Variable::Input)
    }

    /// Hessian of the cost with respect to the state at the reference point, `(batch, n, n)`.
    pub fn cxx(&self) -> Result<Array3<F>, CostError> {
        self.second_order("cxx", Variable::State, Variable::State, |t| t.cxx())
    }

    /// Mixed second derivative `d/dx (dc/du)` at the reference point, `(batch, n, m)`.
    pub fn cxu(&self) -> Result<Array3<F>, CostError> {
        self.second_order("cxu", Variable::State, Variable::Input, |t| t.cxu())
    }

    /// Mixed second derivative `d/du (dc/dx)` at the reference point, `(batch, m, n)`.
    pub fn cux(&self) -> Result<Array3<F>, CostError> {
        self.second_order("cux", Variable::Input, Variable::State, |t| t.cux())
    }

    /// Hessian of the cost with respect to the input at the reference point, `(batch, m, m)`.
    pub fn cuu(&self) -> Result<Array3<F>, CostError> {
        self.second_order("cuu", Variable::Input, Variable::Input, |t| t.cuu())
    }

    /// Constant term of the expansion, `(batch,)`.
    ///
    /// `c = cost - cx x - cu u - 1/2 x^T cxx x - 1/2 x^T cxu u - 1/2 u^T cux x - 1/2 u^T cuu u`
    /// evaluated at the reference point. Costs with closed-form terms return their own
    /// constant instead.
    pub fn c(&self) -> Result<Array1<F>, CostError> {
        let reference = self.reference()?;
        if let Some(terms) = self.cost.closed_form() {
            return Ok(Array1::from_elem(reference.state.nrows(), terms.c()));
        }

        Ok(self.bias(
            reference,
            &self.cx()?,
            &self.cu()?,
            &self.cxx()?,
            &self.cxu()?,
            &self.cux()?,
            &self.cuu()?,
        ))
    }

    /// Evaluate every term of the expansion at once.
    pub fn expansion(&self) -> Result<TaylorExpansion<F>, CostError> {
        let reference = self.reference()?;
        let (cx, cu) = (self.cx()?, self.cu()?);
        let (cxx, cxu, cux, cuu) = (self.cxx()?, self.cxu()?, self.cux()?, self.cuu()?);

        let c = match self.cost.closed_form() {
            Some(terms) => Array1::from_elem(reference.state.nrows(), terms.c()),
            None => self.bias(reference, &cx, &cu, &cxx, &cxu, &cux, &cuu),
        };

        Ok(TaylorExpansion {
            cx,
            cu,
            cxx,
            cxu,
            cux,
            cuu,
            c,
            value: reference.value.clone(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn bias(
        &self,
        reference: &ReferencePoint<F>,
        cx: &Array2<F>,
        cu: &Array2<F>,
        cxx: &Array3<F>,
        cxu: &Array3<F>,
        cux: &Array3<F>,
        cuu: &Array3<F>,
    ) -> Array1<F> {
        let two = F::one() + F::one();
        Array1::from_shape_fn(reference.state.nrows(), |b| {
            let (x, u) = (reference.state.row(b), reference.input.row(b));
            let quadratic = x.dot(&cxx.index_axis(Axis(0), b).dot(&x))
                + x.dot(&cxu.index_axis(Axis(0), b).dot(&u))
                + u.dot(&cux.index_axis(Axis(0), b).dot(&x))
                + u.dot(&cuu.index_axis(Axis(0), b).dot(&u));

            reference.value[b] - cx.row(b).dot(&x) - cu.row(b).dot(&u) - quadratic / two
        })
    }
}
