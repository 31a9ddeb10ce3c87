use approx::assert_relative_eq;
use ndarray::{array, Array1, Array2, Array3, ArrayView2, Axis};
use rand::Rng;
use tangent_autodiff::{DerivativeOptions, DualNum, Scalar};
use tangent_cost::{Cost, CostError, CostLinearizer, QuadraticCost};

/// `sum(x^3) + sum(u^4) + sum(x * u)` for states and inputs of the same size.
struct NonQuadratic;

impl<F: Scalar> Cost<F> for NonQuadratic {
    fn cost<D: DualNum<F> + Copy>(&self, state: ArrayView2<D>, input: ArrayView2<D>) -> Array1<D> {
        state.mapv(|x| x.powi(3)).sum_axis(Axis(1))
            + input.mapv(|u| u.powi(4)).sum_axis(Axis(1))
            + (&state * &input).sum_axis(Axis(1))
    }
}

/// `x0 * u1 + x2 * u0` for three states and two inputs.
struct Coupling;

impl<F: Scalar> Cost<F> for Coupling {
    fn cost<D: DualNum<F> + Copy>(&self, state: ArrayView2<D>, input: ArrayView2<D>) -> Array1<D> {
        Array1::from_shape_fn(state.nrows(), |b| {
            state[[b, 0]] * input[[b, 1]] + state[[b, 2]] * input[[b, 0]]
        })
    }

    fn check_shapes(&self, _batch: usize, n: usize, m: usize) -> Result<(), CostError> {
        if (n, m) != (3, 2) {
            return Err(CostError::DimensionMismatch(format!(
                "coupling needs 3 states and 2 inputs, got {} and {}",
                n, m
            )));
        }
        Ok(())
    }
}

fn random_batch(rows: usize, cols: usize) -> Array2<f64> {
    let mut rng = rand::rng();
    Array2::from_shape_fn((rows, cols), |_| rng.random_range(-2.0..2.0))
}

#[test]
fn test_non_quadratic_derivatives() -> Result<(), CostError> {
    let (state, input) = (random_batch(4, 3), random_batch(4, 3));
    let mut linearizer = CostLinearizer::new(NonQuadratic);
    linearizer.set_reference_point(
        Some(state.view().into_dyn()),
        Some(input.view().into_dyn()),
    )?;

    let cx = linearizer.cx()?;
    let cu = linearizer.cu()?;
    assert_eq!(cx.dim(), (4, 3));
    for ((a, x), u) in cx.iter().zip(state.iter()).zip(input.iter()) {
        assert_relative_eq!(*a, 3.0 * x * x + u, epsilon = 1e-10);
    }
    for ((a, x), u) in cu.iter().zip(state.iter()).zip(input.iter()) {
        assert_relative_eq!(*a, 4.0 * u.powi(3) + x, epsilon = 1e-10);
    }

    let (cxx, cxu, cux, cuu) = (
        linearizer.cxx()?,
        linearizer.cxu()?,
        linearizer.cux()?,
        linearizer.cuu()?,
    );
    assert_eq!(cxx.dim(), (4, 3, 3));
    assert_eq!(cuu.dim(), (4, 3, 3));
    for ((b, i, j), &h) in cxx.indexed_iter() {
        let expected = if i == j { 6.0 * state[[b, i]] } else { 0.0 };
        assert_relative_eq!(h, expected, epsilon = 1e-10);
    }
    for ((b, i, j), &h) in cuu.indexed_iter() {
        let expected = if i == j { 12.0 * input[[b, i]].powi(2) } else { 0.0 };
        assert_relative_eq!(h, expected, epsilon = 1e-10);
    }
    for b in 0..4 {
        assert_eq!(cxu.index_axis(Axis(0), b), Array2::<f64>::eye(3));
        assert_eq!(cux.index_axis(Axis(0), b), Array2::<f64>::eye(3));
    }
    Ok(())
}

#[test]
fn test_expansion_reproduces_reference_value() -> Result<(), CostError> {
    let (state, input) = (random_batch(5, 3), random_batch(5, 3));
    let mut linearizer = CostLinearizer::new(NonQuadratic);
    linearizer.evaluate(&state, &input)?;
    linearizer.set_reference_point(None, None)?;

    let e = linearizer.expansion()?;
    assert_eq!(e.c, linearizer.c()?);
    for b in 0..5 {
        let (x, u) = (state.row(b), input.row(b));
        let quadratic = x.dot(&e.cxx.index_axis(Axis(0), b).dot(&x))
            + x.dot(&e.cxu.index_axis(Axis(0), b).dot(&u))
            + u.dot(&e.cux.index_axis(Axis(0), b).dot(&x))
            + u.dot(&e.cuu.index_axis(Axis(0), b).dot(&u));
        let model = 0.5 * quadratic + e.cx.row(b).dot(&x) + e.cu.row(b).dot(&u) + e.c[b];
        assert_relative_eq!(model, e.value[b], epsilon = 1e-9);
    }
    Ok(())
}

#[test]
fn test_sequential_options_agree() -> Result<(), CostError> {
    let (state, input) = (random_batch(3, 3), random_batch(3, 3));
    let mut parallel = CostLinearizer::new(NonQuadratic);
    let mut sequential = CostLinearizer::new(NonQuadratic)
        .with_options(DerivativeOptions::default().with_vectorize(false));
    parallel.set_reference_point(
        Some(state.view().into_dyn()),
        Some(input.view().into_dyn()),
    )?;
    sequential.set_reference_point(
        Some(state.view().into_dyn()),
        Some(input.view().into_dyn()),
    )?;

    assert_eq!(parallel.expansion()?, sequential.expansion()?);
    Ok(())
}

#[test]
fn test_quadratic_terms_are_exact() -> Result<(), CostError> {
    let q = array![[2.0, 0.5, 0.0], [0.5, 1.0, 0.0], [0.0, 0.0, 3.0]];
    let r = array![[1.0, 0.0], [0.0, 4.0]];
    let s = array![[0.1, 0.2], [0.3, 0.4], [0.5, 0.6]];
    let cost = QuadraticCost::new(
        q.clone().into_dyn(),
        r.clone().into_dyn(),
        s.clone().into_dyn(),
        0.25,
    )?;

    let (state, input) = (random_batch(3, 3), random_batch(3, 2));
    let mut linearizer = CostLinearizer::new(cost);
    linearizer.set_reference_point(
        Some(state.view().into_dyn()),
        Some(input.view().into_dyn()),
    )?;

    let (cxx, cxu, cux, cuu) = (
        linearizer.cxx()?,
        linearizer.cxu()?,
        linearizer.cux()?,
        linearizer.cuu()?,
    );
    for b in 0..3 {
        assert_eq!(cxx.index_axis(Axis(0), b), q);
        assert_eq!(cuu.index_axis(Axis(0), b), r);
        assert_eq!(cxu.index_axis(Axis(0), b), s);
        assert_eq!(cux.index_axis(Axis(0), b), cxu.index_axis(Axis(0), b).t());
    }
    assert_eq!(linearizer.c()?, array![0.25, 0.25, 0.25]);

    // q is symmetric, so the gradients are linear in the reference point
    let cx = linearizer.cx()?;
    let cu = linearizer.cu()?;
    for b in 0..3 {
        let (x, u) = (state.row(b), input.row(b));
        let expected_cx = q.dot(&x) + s.dot(&u);
        let expected_cu = r.dot(&u) + s.t().dot(&x);
        for (a, e) in cx.row(b).iter().zip(expected_cx.iter()) {
            assert_relative_eq!(*a, *e, epsilon = 1e-12);
        }
        for (a, e) in cu.row(b).iter().zip(expected_cu.iter()) {
            assert_relative_eq!(*a, *e, epsilon = 1e-12);
        }
    }
    Ok(())
}

#[test]
fn test_batched_quadratic_cost() -> Result<(), CostError> {
    let q = Array3::from_shape_fn((2, 2, 2), |(b, i, j)| if i == j { (b + 1) as f64 } else { 0.0 });
    let r = Array3::from_elem((2, 1, 1), 1.0);
    let s = Array3::zeros((2, 2, 1));
    let cost = QuadraticCost::new(q.clone().into_dyn(), r.into_dyn(), s.into_dyn(), 0.0)?;

    let mut linearizer = CostLinearizer::new(cost);
    let value = linearizer.evaluate(&array![[1.0, 1.0], [1.0, 1.0]], &array![[0.0], [0.0]])?;
    assert_eq!(value, array![1.0, 2.0]);

    linearizer.set_reference_point(None, None)?;
    assert_eq!(linearizer.cxx()?, q);
    assert_eq!(linearizer.cx()?, array![[1.0, 1.0], [2.0, 2.0]]);

    // a batched cost only accepts its own batch size
    assert!(matches!(
        linearizer.set_reference_point(
            Some(array![[1.0, 1.0]].view().into_dyn()),
            Some(array![[0.0]].view().into_dyn())
        ),
        Err(CostError::DimensionMismatch(_))
    ));
    Ok(())
}

#[test]
fn test_overridden_quadratic_terms() -> Result<(), CostError> {
    let mut cost = QuadraticCost::new(
        Array2::<f64>::eye(2).into_dyn(),
        Array2::<f64>::eye(1).into_dyn(),
        Array2::<f64>::zeros((2, 1)).into_dyn(),
        0.0,
    )?;
    cost.set_cxu(array![[1.0], [-1.0]].into_dyn())?;
    cost.set_cuu(array![[5.0]].into_dyn())?;

    let mut linearizer = CostLinearizer::new(cost);
    linearizer.set_reference_point(
        Some(array![[1.0, 2.0]].view().into_dyn()),
        Some(array![[3.0]].view().into_dyn()),
    )?;
    assert_eq!(linearizer.cxu()?, array![[[1.0], [-1.0]]]);
    assert_eq!(linearizer.cux()?, array![[[1.0, -1.0]]]);
    assert_eq!(linearizer.cuu()?, array![[[5.0]]]);

    linearizer.cost_mut().set_c(7.0);
    assert_eq!(linearizer.c()?, array![7.0]);

    let cost = linearizer.into_inner();
    assert_eq!(cost.terms().c(), 7.0);
    assert_eq!(cost.terms().cuu(), &array![[[5.0]]]);
    Ok(())
}

#[test]
fn test_single_precision_cost() -> Result<(), CostError> {
    let mut linearizer = CostLinearizer::new(NonQuadratic);
    linearizer.evaluate(&array![1.0f32, -1.0], &array![0.5f32, 2.0])?;
    linearizer.set_reference_point(None, None)?;
    let cxx = linearizer.cxx()?;
    assert_relative_eq!(cxx[[0, 0, 0]], 6.0f32);
    assert_relative_eq!(cxx[[0, 1, 1]], -6.0f32);
    Ok(())
}

#[test]
fn test_cross_terms_with_different_sizes() -> Result<(), CostError> {
    let (state, input) = (random_batch(2, 3), random_batch(2, 2));
    let mut linearizer = CostLinearizer::new(Coupling);
    linearizer.set_reference_point(
        Some(state.view().into_dyn()),
        Some(input.view().into_dyn()),
    )?;

    let cxu = linearizer.cxu()?;
    let cux = linearizer.cux()?;
    assert_eq!(cxu.dim(), (2, 3, 2));
    assert_eq!(cux.dim(), (2, 2, 3));
    let expected = array![[0.0, 1.0], [0.0, 0.0], [1.0, 0.0]];
    for b in 0..2 {
        assert_eq!(cxu.index_axis(Axis(0), b), expected);
        assert_eq!(cux.index_axis(Axis(0), b), expected.t());
    }
    assert_eq!(linearizer.cxx()?, Array3::zeros((2, 3, 3)));
    assert_eq!(linearizer.cuu()?, Array3::zeros((2, 2, 2)));

    // bilinear: c = v - cx x - cu u - 1/2 (x cxu u + u cux x) = -2 v
    let c = linearizer.c()?;
    for b in 0..2 {
        let v = state[[b, 0]] * input[[b, 1]] + state[[b, 2]] * input[[b, 0]];
        assert_relative_eq!(c[b], -2.0 * v, epsilon = 1e-12);
    }

    assert!(matches!(
        linearizer.evaluate(&random_batch(2, 2), &random_batch(2, 3)),
        Err(CostError::DimensionMismatch(_))
    ));
    Ok(())
}

#[test]
fn test_overridden_terms_keep_cost_batch() -> Result<(), CostError> {
    let mut cost = QuadraticCost::new(
        Array3::<f64>::zeros((2, 2, 2)).into_dyn(),
        Array3::<f64>::zeros((2, 1, 1)).into_dyn(),
        Array3::<f64>::zeros((2, 2, 1)).into_dyn(),
        0.0,
    )?;
    cost.set_cxx(Array2::<f64>::eye(2).into_dyn())?;
    cost.set_cxu(Array2::<f64>::zeros((2, 1)).into_dyn())?;
    cost.set_cuu(Array2::<f64>::eye(1).into_dyn())?;

    let mut linearizer = CostLinearizer::new(cost);
    let (state, input) = (Array2::<f64>::zeros((3, 2)), Array2::<f64>::zeros((3, 1)));
    assert!(matches!(
        linearizer.evaluate(&state, &input),
        Err(CostError::DimensionMismatch(_))
    ));
    assert!(matches!(
        linearizer.set_reference_point(
            Some(state.view().into_dyn()),
            Some(input.view().into_dyn())
        ),
        Err(CostError::DimensionMismatch(_))
    ));

    let value = linearizer.evaluate(&Array2::<f64>::ones((2, 2)), &Array2::<f64>::ones((2, 1)))?;
    assert_eq!(value, array![0.0, 0.0]);
    Ok(())
}
