use std::ops::{Add, Mul};

use ndarray::{Array1, Array3, ArrayD, ArrayView1, ArrayView2, Axis, Ix3};
use num_traits::Zero;
use tangent_autodiff::{lift, DualNum, Scalar};

use crate::{cost::Cost, error::CostError};

/// Exact second-order terms and constant of a quadratic cost.
///
/// Each matrix has a leading batch dimension, which is 1 for terms shared by every batch
/// row.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticTerms<F> {
    cxx: Array3<F>,
    cxu: Array3<F>,
    cux: Array3<F>,
    cuu: Array3<F>,
    c: F,
}

impl<F: Scalar> QuadraticTerms<F> {
    /// Quadratic term on the state, `(batch, n, n)`.
    pub fn cxx(&self) -> &Array3<F> {
        &self.cxx
    }

    /// Cross term on state and input, `(batch, n, m)`.
    pub fn cxu(&self) -> &Array3<F> {
        &self.cxu
    }

    /// Cross term on input and state, `(batch, m, n)`. Always the transpose of [`Self::cxu`].
    pub fn cux(&self) -> &Array3<F> {
        &self.cux
    }

    /// Quadratic term on the input, `(batch, m, m)`.
    pub fn cuu(&self) -> &Array3<F> {
        &self.cuu
    }

    /// Constant term.
    pub fn c(&self) -> F {
        self.c
    }

    /// Check the terms against a batch of states and inputs.
    ///
    /// Every term must have a batch size of 1 or `batch`, and match the state and input
    /// widths.
    pub fn check(&self, batch: usize, n: usize, m: usize) -> Result<(), CostError> {
        let terms = [
            ("cxx", &self.cxx, (n, n)),
            ("cxu", &self.cxu, (n, m)),
            ("cux", &self.cux, (m, n)),
            ("cuu", &self.cuu, (m, m)),
        ];

        for (name, term, (rows, cols)) in terms {
            let (b, r, c) = term.dim();
            if (b != 1 && b != batch) || (r, c) != (rows, cols) {
                return Err(CostError::DimensionMismatch(format!(
                    "{} has shape {:?}, incompatible with a batch of {} states of size {} and \
                     inputs of size {}",
                    name,
                    term.dim(),
                    batch,
                    n,
                    m
                )));
            }
        }

        Ok(())
    }
}

/// Quadratic cost
///
/// `c = 1/2 (x^T Q x + x^T S u + u^T S^T x + u^T R u) + c0`
///
/// The second-order terms are known in closed form: `cxx = Q`, `cxu = S`, `cux = S^T` and
/// `cuu = R`, and the constant term is `c0`. Only the first-order terms are differentiated.
///
/// The matrices are either unbatched, shared by every batch row, or carry one matrix per
/// batch row.
///
/// # Example
///
/// ```
/// use ndarray::{array, Array2};
/// use tangent_cost::{CostLinearizer, QuadraticCost};
///
/// let q = Array2::<f64>::eye(2).into_dyn();
/// let r = array![[2.0]].into_dyn();
/// let s = Array2::<f64>::zeros((2, 1)).into_dyn();
/// let cost = QuadraticCost::new(q, r, s, 0.0).unwrap();
///
/// let mut linearizer = CostLinearizer::new(cost);
/// linearizer
///     .set_reference_point(Some(array![[1.0, 2.0]].view().into_dyn()), Some(array![[3.0]].view().into_dyn()))
///     .unwrap();
/// assert_eq!(linearizer.cx().unwrap(), array![[1.0, 2.0]]);
/// assert_eq!(linearizer.cu().unwrap(), array![[6.0]]);
/// ```
#[derive(Debug, Clone)]
pub struct QuadraticCost<F> {
    q: Array3<F>,
    r: Array3<F>,
    s: Array3<F>,
    terms: QuadraticTerms<F>,
}

fn check_rank(name: &str, ndim: usize) -> Result<(), CostError> {
    if ndim == 2 || ndim == 3 {
        Ok(())
    } else {
        Err(CostError::DimensionMismatch(format!(
            "{} must be 2-D or 3-D, got {} dimensions",
            name, ndim
        )))
    }
}

/// Give an unbatched matrix a leading batch dimension of 1.
fn promote<F: Scalar>(name: &str, matrix: ArrayD<F>) -> Result<Array3<F>, CostError> {
    check_rank(name, matrix.ndim())?;
    let matrix = if matrix.ndim() == 2 {
        matrix.insert_axis(Axis(0))
    } else {
        matrix
    };
    matrix
        .into_dimensionality::<Ix3>()
        .map_err(|e| CostError::DimensionMismatch(format!("{}: {}", name, e)))
}

fn transpose<F: Scalar>(matrix: &Array3<F>) -> Array3<F> {
    matrix
        .view()
        .permuted_axes([0, 2, 1])
        .as_standard_layout()
        .into_owned()
}

/// Replace a term, keeping its matrix size.
fn conform<F: Scalar>(name: &str, old: &Array3<F>, new: ArrayD<F>) -> Result<Array3<F>, CostError> {
    let new = promote(name, new)?;
    if new.shape()[1..] != old.shape()[1..] {
        return Err(CostError::DimensionMismatch(format!(
            "{} must be a {}x{} matrix, got {:?}",
            name,
            old.shape()[1],
            old.shape()[2],
            new.shape()
        )));
    }
    Ok(new)
}

fn batch_entry<D>(matrix: &Array3<D>, b: usize) -> ArrayView2<'_, D> {
    let index = if matrix.shape()[0] == 1 { 0 } else { b };
    matrix.index_axis(Axis(0), index)
}

/// `a^T m b`
fn bilinear<D>(a: ArrayView1<'_, D>, m: ArrayView2<'_, D>, b: ArrayView1<'_, D>) -> D
where
    D: Copy + Zero + Add<Output = D> + Mul<Output = D>,
{
    m.indexed_iter()
        .fold(D::zero(), |acc, ((i, j), &mij)| acc + a[i] * mij * b[j])
}

impl<F: Scalar> QuadraticCost<F> {
    /// Create a quadratic cost.
    ///
    /// # Arguments
    ///
    /// * `q` - State weight, `(n, n)` or `(batch, n, n)`.
    /// * `r` - Input weight, `(m, m)` or `(batch, m, m)`.
    /// * `s` - Cross weight, `(n, m)` or `(batch, n, m)`.
    /// * `c` - Constant term.
    ///
    /// # Errors
    ///
    /// Returns [`CostError::DimensionMismatch`] if a matrix is neither 2-D nor 3-D, if the
    /// ranks differ, or if the sizes of the matrices are inconsistent.
    pub fn new(q: ArrayD<F>, r: ArrayD<F>, s: ArrayD<F>, c: F) -> Result<Self, CostError> {
        check_rank("Q", q.ndim())?;
        check_rank("R", r.ndim())?;
        if q.ndim() != r.ndim() || r.ndim() != s.ndim() {
            return Err(CostError::DimensionMismatch(format!(
                "Q, R and S must have the same number of dimensions, got {}, {} and {}",
                q.ndim(),
                r.ndim(),
                s.ndim()
            )));
        }

        let q = promote("Q", q)?;
        let r = promote("R", r)?;
        let s = promote("S", s)?;

        let (bq, n, nq) = q.dim();
        let (br, m, mr) = r.dim();
        let (bs, ns, ms) = s.dim();
        if n != nq || m != mr {
            return Err(CostError::DimensionMismatch(format!(
                "Q and R must be square, got {}x{} and {}x{}",
                n, nq, m, mr
            )));
        }
        if (ns, ms) != (n, m) {
            return Err(CostError::DimensionMismatch(format!(
                "S must be a {}x{} matrix, got {}x{}",
                n, m, ns, ms
            )));
        }
        if bq != br || br != bs {
            return Err(CostError::DimensionMismatch(format!(
                "Q, R and S must have the same batch size, got {}, {} and {}",
                bq, br, bs
            )));
        }

        let terms = QuadraticTerms {
            cxx: q.clone(),
            cxu: s.clone(),
            cux: transpose(&s),
            cuu: r.clone(),
            c,
        };

        Ok(Self { q, r, s, terms })
    }

    /// The closed-form terms.
    pub fn terms(&self) -> &QuadraticTerms<F> {
        &self.terms
    }

    /// Override the quadratic term on the state.
    ///
    /// Only the reported term changes; the cost is still evaluated with `Q`.
    pub fn set_cxx(&mut self, cxx: ArrayD<F>) -> Result<(), CostError> {
        self.terms.cxx = conform("cxx", &self.terms.cxx, cxx)?;
        Ok(())
    }

    /// Override the cross term on state and input. `cux` is set to its transpose.
    pub fn set_cxu(&mut self, cxu: ArrayD<F>) -> Result<(), CostError> {
        let cxu = conform("cxu", &self.terms.cxu, cxu)?;
        self.terms.cux = transpose(&cxu);
        self.terms.cxu = cxu;
        Ok(())
    }

    /// Override the quadratic term on the input.
    pub fn set_cuu(&mut self, cuu: ArrayD<F>) -> Result<(), CostError> {
        self.terms.cuu = conform("cuu", &self.terms.cuu, cuu)?;
        Ok(())
    }

    /// Set the constant term. It is used by the cost evaluation as well.
    pub fn set_c(&mut self, c: F) {
        self.terms.c = c;
    }
}

impl<F: Scalar> Cost<F> for QuadraticCost<F> {
    /// # Panics
    ///
    /// Panics if the matrices are batched with a batch size other than the number of rows,
    /// or if their sizes do not match the state and input widths. The
    /// [`CostLinearizer`](crate::CostLinearizer) rejects both through
    /// [`check_shapes`](Cost::check_shapes) before evaluating.
    fn cost<D: DualNum<F> + Copy>(
        &self,
        state: ArrayView2<'_, D>,
        input: ArrayView2<'_, D>,
    ) -> Array1<D> {
        let q: Array3<D> = lift(&self.q);
        let r: Array3<D> = lift(&self.r);
        let s: Array3<D> = lift(&self.s);
        let two = D::one() + D::one();
        let c = D::from(self.terms.c);

        Array1::from_shape_fn(state.nrows(), |b| {
            let (x, u) = (state.row(b), input.row(b));
            let (qb, rb, sb) = (batch_entry(&q, b), batch_entry(&r, b), batch_entry(&s, b));

            let twice = bilinear(x, qb, x)
                + bilinear(x, sb, u)
                + bilinear(u, sb.t(), x)
                + bilinear(u, rb, u);
            twice / two + c
        })
    }

    fn check_shapes(&self, batch: usize, n: usize, m: usize) -> Result<(), CostError> {
        let (bq, nq, _) = self.q.dim();
        let (_, mr, _) = self.r.dim();
        if bq != 1 && bq != batch {
            return Err(CostError::DimensionMismatch(format!(
                "Q, R and S have a batch size of {}, cannot evaluate {} rows",
                bq, batch
            )));
        }
        if (nq, mr) != (n, m) {
            return Err(CostError::DimensionMismatch(format!(
                "cost expects states of size {} and inputs of size {}, got {} and {}",
                nq, mr, n, m
            )));
        }
        Ok(())
    }

    fn closed_form(&self) -> Option<&QuadraticTerms<F>> {
        Some(&self.terms)
    }
}
