use thiserror::Error;

/// An error type for the differentiation routines.
#[derive(Error, Debug, PartialEq)]
pub enum AutodiffError {
    /// The differentiated function returned an output of an unexpected size.
    #[error("Function output has size {actual}, expected {expected}")]
    OutputShape {
        /// Size expected from the input batch or the first forward pass.
        expected: usize,
        /// Size actually returned.
        actual: usize,
    },

    /// The arguments of a function of two batches have different batch sizes.
    #[error("Arguments have batch sizes {left} and {right}")]
    BatchMismatch {
        /// Batch size of the first argument.
        left: usize,
        /// Batch size of the second argument.
        right: usize,
    },

    /// The input has no coordinates to differentiate against.
    #[error("Cannot differentiate with respect to an empty input")]
    EmptyInput,

    /// Error assembling the derivative arrays.
    #[error(transparent)]
    Layout(#[from] ndarray::ShapeError),
}
