use std::cell::Ref;

use ndarray::{ArrayBase, ArrayD, ArrayView, Data, Dimension, IxDyn, ShapeBuilder};
use xt_backend::Element;

use super::{Device, ElementType, Tensor};
use crate::{Error, Result};

impl Tensor {
    /// Create a host tensor holding a copy of an ndarray.
    ///
    /// A zero-dimensional array becomes a scalar.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NonPositiveSize`] if the array has an axis of length zero.
    pub fn from_array<A, S, D>(array: &ArrayBase<S, D>) -> Result<Self>
    where
        A: Element,
        S: Data<Elem = A>,
        D: Dimension,
    {
        if let (0, Some(&value)) = (array.ndim(), array.iter().next()) {
            return Ok(Tensor::scalar(value));
        }
        let sizes = array.shape().iter().map(|&d| d as i64).collect::<Vec<_>>();
        let mut tensor = Tensor::with_shape(&sizes, ElementType::of::<A>(), Device::Cpu)?;
        tensor
            .data_mut::<A>()?
            .iter_mut()
            .zip(array.iter())
            .for_each(|(dst, &src)| *dst = src);
        Ok(tensor)
    }

    /// Copy the elements into an owned ndarray of the tensor shape.
    ///
    /// A scalar becomes a zero-dimensional array, and a rank-zero storage an array of shape `[0]`. Works for tensors
    /// on any device.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::TypeMismatch`] if `T` is not the element type.
    pub fn to_array<T: Element>(&self) -> Result<ArrayD<T>> {
        let requested = ElementType::of::<T>();
        if requested != self.element_type {
            return Err(Error::TypeMismatch {
                expected: self.element_type,
                actual: requested,
            });
        }
        let shape = match self.dim() {
            -1 => vec![0],
            _ => self.sizes().iter().map(|&d| d as usize).collect(),
        };
        let values = self.to_values::<T>()?;
        ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|_| Error::NumelMismatch {
            dst: shape.iter().product(),
            src: self.numel(),
        })
    }

    /// Borrow the elements of a host tensor as an ndarray view.
    ///
    /// # Errors
    ///
    /// Fails as [`Tensor::data`].
    pub fn as_array<T: Element>(&self) -> Result<TensorArrayView<'_, T>> {
        let (shape, strides) = match self.dim() {
            -1 => (vec![0], vec![1]),
            _ => (
                self.sizes().iter().map(|&d| d as usize).collect(),
                self.strides().iter().map(|&s| s as usize).collect(),
            ),
        };
        let offset = self.offset() as usize;
        Ok(TensorArrayView {
            data: self.data::<T>()?,
            shape,
            strides,
            offset,
        })
    }
}

/// The borrowed storage of a host tensor, viewable as an ndarray.
///
/// The storage stays borrowed while this struct is alive.
pub struct TensorArrayView<'a, T> {
    data: Ref<'a, [T]>,
    shape: Vec<usize>,
    strides: Vec<usize>,
    offset: usize,
}
impl<T> TensorArrayView<'_, T> {
    /// Get an array view of the tensor with dynamic number of dimensions.
    pub fn view(&self) -> ArrayView<'_, T, IxDyn> {
        let shape = IxDyn(&self.shape).strides(IxDyn(&self.strides));
        // Safety: the storage covers every element reachable by the non-negative strides from the offset.
        unsafe { ArrayView::from_shape_ptr(shape, self.data.as_ptr().wrapping_add(self.offset)) }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{arr0, array, Array3, ArrayD, IxDyn};

    use super::*;

    #[test]
    fn from_array() {
        let tensor = Tensor::from_array(&array![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(tensor.element_type(), ElementType::Float);
        assert_eq!(tensor.sizes(), vec![2, 3]);
        assert_eq!(&*tensor.data::<f32>().unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let transposed = Tensor::from_array(&array![[1i16, 2], [3, 4]].t()).unwrap();
        assert_eq!(&*transposed.data::<i16>().unwrap(), &[1, 3, 2, 4]);

        let scalar = Tensor::from_array(&arr0(9u8)).unwrap();
        assert!(scalar.is_scalar());
        assert_eq!(scalar.value::<u8>(), Ok(9));
    }

    #[test]
    fn from_empty_array() {
        let array = Array3::<i32>::zeros((2, 0, 3));
        assert_eq!(
            Tensor::from_array(&array).err(),
            Some(Error::NonPositiveSize { dim: 1, size: 0 })
        );
    }

    #[test]
    fn to_array() {
        let tensor = Tensor::from_array(&array![[1i64, 2], [3, 4]]).unwrap();
        let array = tensor.to_array::<i64>().unwrap();
        assert_eq!(array, array![[1i64, 2], [3, 4]].into_dyn());
        assert!(tensor.to_array::<i32>().is_err());

        let scalar = Tensor::scalar(2.5f64).to_array::<f64>().unwrap();
        assert_eq!(scalar, arr0(2.5).into_dyn());

        let typed = Tensor::typed(ElementType::Int8, Device::Cpu).unwrap();
        assert_eq!(typed.to_array::<i8>().unwrap(), ArrayD::<i8>::zeros(IxDyn(&[0])));
    }

    #[test]
    fn strided_view() {
        let mut tensor =
            Tensor::with_shape_and_strides(&[2, 3], &[1, 2], ElementType::Int32, Device::Cpu)
                .unwrap();
        tensor
            .data_mut::<i32>()
            .unwrap()
            .copy_from_slice(&[0, 3, 1, 4, 2, 5]);
        let view = tensor.as_array::<i32>().unwrap();
        assert_eq!(view.view(), array![[0, 1, 2], [3, 4, 5]].into_dyn());
    }
}
