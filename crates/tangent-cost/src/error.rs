use tangent_autodiff::AutodiffError;
use thiserror::Error;

/// An error type for the cost module.
#[derive(Error, Debug, PartialEq)]
pub enum CostError {
    /// A derivative was requested before any reference point was set.
    #[error("Reference point is not set, call set_reference_point first")]
    ReferenceNotSet,

    /// The reference point was set from the most recent evaluation, but there was none.
    #[error("No state or input was evaluated yet to take the reference point from")]
    NoRecentInput,

    /// The cost matrices have inconsistent ranks or sizes.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// The state or input batch has an invalid shape.
    #[error("Invalid shape: {0}")]
    Shape(String),

    /// Error while differentiating the cost.
    #[error(transparent)]
    Autodiff(#[from] AutodiffError),
}
