use ndarray::{stack, Array1, ArrayBase, Axis, Data, Dimension};

use crate::{
    error::LieError,
    lietensor::LieTensor,
    ltype::LieType,
    ops::{flatten_vectors, unflatten, LieScalar},
};

/// Convert batched Euler angles to SO3 quaternions.
///
/// The angles are `[roll, pitch, yaw]` in radians, applied as yaw, then pitch, then roll
/// (intrinsic z-y'-x'').
///
/// # Arguments
///
/// * `euler` - Array of shape `(*, 3)`.
///
/// # Returns
///
/// A [`LieType::SO3`] tensor of shape `(*, 4)` holding `[qx, qy, qz, qw]`.
///
/// # Errors
///
/// Returns [`LieError::Shape`] if the trailing dimension is not 3.
///
/// Example:
///
/// ```
/// use ndarray::array;
/// use tangent_lie::euler_to_rotation;
///
/// let so3 = euler_to_rotation(&array![0.0, 0.0, std::f64::consts::FRAC_PI_2]).unwrap();
/// assert!((so3.tensor()[2] - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
/// ```
pub fn euler_to_rotation<T, S, D>(euler: &ArrayBase<S, D>) -> Result<LieTensor<T>, LieError>
where
    T: LieScalar,
    S: Data<Elem = T>,
    D: Dimension,
{
    let (batch, flat) = flatten_vectors(euler, 3)?;
    let half = flat.mapv(|a| a * T::from_literal(0.5));

    let (sin, cos) = (half.mapv(T::sin), half.mapv(T::cos));
    let (sr, sp, sy) = (sin.column(0), sin.column(1), sin.column(2));
    let (cr, cp, cy) = (cos.column(0), cos.column(1), cos.column(2));

    let x: Array1<T> = &sr * &cp * &cy - &cr * &sp * &sy;
    let y: Array1<T> = &cr * &sp * &cy + &sr * &cp * &sy;
    let z: Array1<T> = &cr * &cp * &sy - &sr * &sp * &cy;
    let w: Array1<T> = &cr * &cp * &cy + &sr * &sp * &sy;

    let q = stack(Axis(1), &[x.view(), y.view(), z.view(), w.view()])?;
    LieTensor::new(LieType::SO3, unflatten(&q, &batch)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array3};

    #[test]
    fn test_zero_angles_are_identity() -> Result<(), LieError> {
        let so3 = euler_to_rotation(&Array3::<f32>::zeros((2, 4, 3)))?;
        assert_eq!(so3.lshape(), &[2, 4]);
        for q in so3.tensor().rows() {
            assert_eq!(q.to_vec(), vec![0.0, 0.0, 0.0, 1.0]);
        }
        Ok(())
    }

    #[test]
    fn test_matches_glam() -> Result<(), LieError> {
        let (roll, pitch, yaw) = (0.3, -0.7, 1.9);
        let q = euler_to_rotation(&array![roll, pitch, yaw])?.into_tensor();
        let expected = glam::DQuat::from_euler(glam::EulerRot::ZYX, yaw, pitch, roll);
        assert_relative_eq!(q[0], expected.x, epsilon = 1e-12);
        assert_relative_eq!(q[1], expected.y, epsilon = 1e-12);
        assert_relative_eq!(q[2], expected.z, epsilon = 1e-12);
        assert_relative_eq!(q[3], expected.w, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_shape_errors() {
        assert!(matches!(
            euler_to_rotation(&array![0.0, 1.0]),
            Err(LieError::Shape(_))
        ));
        assert!(matches!(
            euler_to_rotation(&ndarray::arr0(0.0)),
            Err(LieError::Shape(_))
        ));
    }
}
