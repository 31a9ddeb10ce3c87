use ndarray::{ArrayD, ArrayViewD};

use crate::{error::LieError, ltype::LieType, ops::LieScalar};

/// A batch of Lie group (or algebra) elements in their minimal encoding.
///
/// The trailing dimension of the data holds one element and always matches
/// [`LieType::dimension`]; every leading dimension is a batch dimension.
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use tangent_lie::{LieTensor, LieType};
///
/// let identity = LieTensor::new(LieType::SO3, array![0.0, 0.0, 0.0, 1.0].into_dyn()).unwrap();
/// assert_eq!(identity.ltype(), LieType::SO3);
/// assert!(identity.lshape().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LieTensor<T> {
    ltype: LieType,
    data: ArrayD<T>,
}

impl<T: LieScalar> LieTensor<T> {
    /// Wrap an array as a tensor of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`LieError::Shape`] if the array is a scalar or its trailing dimension does
    /// not match the type.
    pub fn new(ltype: LieType, data: ArrayD<T>) -> Result<Self, LieError> {
        match data.shape().last() {
            Some(&last) if last == ltype.dimension() => Ok(Self { ltype, data }),
            _ => Err(LieError::Shape(format!(
                "{} tensor must have a trailing dimension of {}, got {:?}",
                ltype,
                ltype.dimension(),
                data.shape()
            ))),
        }
    }

    /// The Lie type of the tensor.
    pub fn ltype(&self) -> LieType {
        self.ltype
    }

    /// View of the underlying data, including the trailing element dimension.
    pub fn tensor(&self) -> ArrayViewD<'_, T> {
        self.data.view()
    }

    /// Consume the tensor and return the underlying data.
    pub fn into_tensor(self) -> ArrayD<T> {
        self.data
    }

    /// The batch shape, i.e. the shape without the trailing element dimension.
    pub fn lshape(&self) -> &[usize] {
        let shape = self.data.shape();
        &shape[..shape.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn test_new_checks_trailing_dimension() {
        let data = Array2::<f64>::zeros((5, 7)).into_dyn();
        assert!(LieTensor::new(LieType::SE3, data.clone()).is_ok());
        assert!(matches!(
            LieTensor::new(LieType::SO3, data),
            Err(LieError::Shape(_))
        ));

        let scalar = ndarray::arr0(1.0f32).into_dyn();
        assert!(matches!(
            LieTensor::new(LieType::SO3Algebra, scalar),
            Err(LieError::Shape(_))
        ));
    }

    #[test]
    fn test_lshape() -> Result<(), LieError> {
        let tensor = LieTensor::new(LieType::Sim3, Array3::<f32>::zeros((2, 3, 8)).into_dyn())?;
        assert_eq!(tensor.lshape(), &[2, 3]);
        assert_eq!(tensor.tensor().shape(), &[2, 3, 8]);
        Ok(())
    }
}
