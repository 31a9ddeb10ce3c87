#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Tangent Autodiff
//!
//! Functions are written once against [`DualNum`] and evaluated on the dual numbers of
//! [`num_dual`]: [`Dual`] for gradients and Jacobians, [`HyperDual`] for Hessians. The
//! helpers here seed whole batches of independent rows at once, so the number of forward
//! passes depends on the row width only.
//!
//! ## Example
//!
//! ```rust
//! use ndarray::{array, Array1, ArrayView2, Axis};
//! use tangent_autodiff::{batch_gradient, batch_hessian, DerivativeOptions, DualNum};
//!
//! // one output per row: sum of cubes
//! fn energy<D: DualNum<f64> + Copy>(x: ArrayView2<D>) -> Array1<D> {
//!     x.mapv(|v| v * v * v).sum_axis(Axis(1))
//! }
//!
//! let points = array![[1.0, 2.0], [3.0, 4.0]];
//! let options = DerivativeOptions::default();
//!
//! let grad = batch_gradient(|x| energy(x), points.view(), &options).unwrap();
//! assert_eq!(grad, array![[3.0, 12.0], [27.0, 48.0]]);
//!
//! let hessian = batch_hessian(|x| energy(x), points.view(), &options).unwrap();
//! assert_eq!(hessian[[1, 1, 1]], 24.0);
//! ```

/// Batched derivative evaluation.
pub mod derivative;

/// Error types for the autodiff module.
pub mod error;

pub use derivative::{
    batch_gradient, batch_hessian, batch_jacobian, batch_partial_hessian, lift,
    DerivativeOptions, Scalar,
};
pub use error::AutodiffError;
pub use num_dual::{Dual, DualNum, DualNumFloat, HyperDual};
