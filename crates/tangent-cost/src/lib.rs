#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Tangent Cost
//!
//! Second-order expansions of stage costs for trajectory optimization. A [`Cost`] is
//! written once against [`tangent_autodiff::DualNum`] and the [`CostLinearizer`] derives its
//! gradients `cx`, `cu`, its Hessian blocks `cxx`, `cxu`, `cux`, `cuu` and the constant
//! term `c` around a reference point.
//!
//! [`QuadraticCost`] reports its exact second-order terms without differentiating.

/// The cost trait.
pub mod cost;

/// Error types for the cost module.
pub mod error;

/// Expansion of costs around a reference point.
pub mod linearizer;

/// Quadratic costs with closed-form terms.
pub mod quadratic;

pub use cost::Cost;
pub use error::CostError;
pub use linearizer::{CostLinearizer, TaylorExpansion};
pub use quadratic::{QuadraticCost, QuadraticTerms};
