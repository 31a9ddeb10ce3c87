#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Tangent Lie
//!
//! Closed-form conversions between batched rotation or transformation matrices and the
//! minimal encodings of the 3D Lie groups used in robotics and computer vision.
//!
//! ## Supported Groups
//!
//! - **SO(3)**: `[qx, qy, qz, qw]`
//! - **SE(3)**: `[tx, ty, tz, qx, qy, qz, qw]`
//! - **Sim(3)**: `[tx, ty, tz, qx, qy, qz, qw, s]`
//! - **RxSO(3)**: `[qx, qy, qz, qw, s]`
//!
//! Every conversion accepts arrays with any number of leading batch dimensions.
//!
//! ## Example
//!
//! ```rust
//! use ndarray::array;
//! use tangent_lie::{from_matrix, LieType};
//!
//! let mat = array![
//!     [0.0f64, -1.0, 0.0, 0.5],
//!     [1.0, 0.0, 0.0, 0.0],
//!     [0.0, 0.0, 1.0, 0.0],
//!     [0.0, 0.0, 0.0, 1.0],
//! ];
//! let se3 = from_matrix(&mat, LieType::SE3, true).unwrap();
//! assert_eq!(se3.tensor().shape(), &[7]);
//!
//! let back = se3.matrix().unwrap();
//! assert!((back[[0, 3]] - 0.5).abs() < 1e-12);
//! ```

/// Matrix to Lie group conversions.
pub mod convert;

/// Error types for the Lie module.
pub mod error;

/// Euler angle conversions.
pub mod euler;

/// Batched Lie group tensors.
pub mod lietensor;

/// Lie group and algebra type tags.
pub mod ltype;

/// Lie group to matrix conversions.
pub mod matrix;

/// Scalar types and batched array helpers.
pub mod ops;

pub use convert::{
    from_matrix, matrix_to_quaternion, matrix_to_rigid, matrix_to_scaled_rotation,
    matrix_to_similarity,
};
pub use error::{InvalidRotationKind, LieError};
pub use euler::euler_to_rotation;
pub use lietensor::LieTensor;
pub use ltype::LieType;
pub use matrix::quaternion_to_matrix;
pub use ops::LieScalar;
