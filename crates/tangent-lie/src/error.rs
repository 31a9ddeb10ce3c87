use thiserror::Error;

/// Reason a matrix was rejected by the rotation validity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidRotationKind {
    /// `R * R^T` is not the identity.
    NotOrthogonal,
    /// `det(R)` is not one.
    Determinant,
}

impl std::fmt::Display for InvalidRotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidRotationKind::NotOrthogonal => write!(f, "matrices are not all orthogonal"),
            InvalidRotationKind::Determinant => {
                write!(f, "matrix determinants are not all equal to 1")
            }
        }
    }
}

/// An error type for the Lie group conversions.
#[derive(Error, Debug, PartialEq)]
pub enum LieError {
    /// The input does not have the expected rank or trailing dimensions.
    #[error("Invalid shape: {0}")]
    Shape(String),

    /// The input is not a valid rotation. Only raised when checking is requested.
    #[error("Invalid rotation: {0}")]
    InvalidRotation(InvalidRotationKind),

    /// The scale factor of at least one batch entry is zero.
    #[error("Scale factor is zero, the rotation block is not full rank")]
    SingularScale,

    /// The requested Lie type has no conversion for this operation.
    #[error("Unsupported Lie type: {0}")]
    UnsupportedVariant(String),

    /// Error reshaping the underlying array.
    #[error(transparent)]
    Layout(#[from] ndarray::ShapeError),
}
