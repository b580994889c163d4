use std::cell::{Ref, RefMut};
use std::ops::{Index, IndexMut};

pub(crate) struct AccessorLayout<const N: usize> {
    sizes: [i64; N],
    strides: [i64; N],
    offset: i64,
}

impl<const N: usize> AccessorLayout<N> {
    /// Returns `None` if the layout rank is not `N`.
    pub(crate) fn new(sizes: &[i64], strides: &[i64], offset: i64) -> Option<Self> {
        Some(Self {
            sizes: sizes.try_into().ok()?,
            strides: strides.try_into().ok()?,
            offset,
        })
    }

    fn offset_of(&self, index: [usize; N]) -> Option<usize> {
        let valid_index = index
            .iter()
            .zip(self.sizes)
            .all(|(&idx, size)| idx < size as usize);
        if !valid_index {
            return None;
        }
        let mut offset = self.offset;
        for (&idx, stride) in index.iter().zip(self.strides) {
            offset += idx as i64 * stride;
        }
        Some(offset as usize)
    }
}

/// A fast accessor for a host tensor.
///
/// The accessor is a utility struct, templated over the type of the tensor elements and the number of dimensions,
/// which make it efficient to access tensor elements by index. A [`Tensor`](crate::Tensor) stores its element type
/// and number of dimensions dynamically; if both are known at compile time, obtain an accessor with
/// [`Tensor::accessor`](crate::Tensor::accessor) and index it directly.
///
/// The accessor borrows the storage for its lifetime.
pub struct TensorAccessor<'a, T, const N: usize> {
    data: Ref<'a, [T]>,
    layout: AccessorLayout<N>,
}
impl<'a, T, const N: usize> TensorAccessor<'a, T, N> {
    pub(crate) fn new(data: Ref<'a, [T]>, layout: AccessorLayout<N>) -> Self {
        Self { data, layout }
    }

    /// Get a reference to the tensor element at the given index.
    ///
    /// Returns the element at the given index, or `None` if the index is out of bounds.
    pub fn get(&self, index: [usize; N]) -> Option<&T> {
        let offset = self.layout.offset_of(index)?;
        self.data.get(offset)
    }
}
impl<T> Index<usize> for TensorAccessor<'_, T, 1> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &Self::Output {
        self.get([index]).unwrap()
    }
}
impl<T, const N: usize> Index<[usize; N]> for TensorAccessor<'_, T, N> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: [usize; N]) -> &Self::Output {
        self.get(index).unwrap()
    }
}

/// A mutable accessor for a host tensor.
///
/// This is similar to [`TensorAccessor`], but allows for mutable access to the tensor elements. Writes are observed
/// by every handle sharing the storage.
pub struct TensorAccessorMut<'a, T, const N: usize> {
    data: RefMut<'a, [T]>,
    layout: AccessorLayout<N>,
}
impl<'a, T, const N: usize> TensorAccessorMut<'a, T, N> {
    pub(crate) fn new(data: RefMut<'a, [T]>, layout: AccessorLayout<N>) -> Self {
        Self { data, layout }
    }

    /// Get a reference to the tensor element at the given index.
    ///
    /// Returns the element at the given index, or `None` if the index is out of bounds.
    pub fn get(&self, index: [usize; N]) -> Option<&T> {
        let offset = self.layout.offset_of(index)?;
        self.data.get(offset)
    }

    /// Get a mutable reference to the tensor element at the given index.
    ///
    /// Returns the element at the given index, or `None` if the index is out of bounds.
    pub fn get_mut(&mut self, index: [usize; N]) -> Option<&mut T> {
        let offset = self.layout.offset_of(index)?;
        self.data.get_mut(offset)
    }
}
impl<T> Index<usize> for TensorAccessorMut<'_, T, 1> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: usize) -> &Self::Output {
        self.get([index]).unwrap()
    }
}
impl<T, const N: usize> Index<[usize; N]> for TensorAccessorMut<'_, T, N> {
    type Output = T;

    #[track_caller]
    fn index(&self, index: [usize; N]) -> &Self::Output {
        self.get(index).unwrap()
    }
}
impl<T> IndexMut<usize> for TensorAccessorMut<'_, T, 1> {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        self.get_mut([index]).unwrap()
    }
}
impl<T, const N: usize> IndexMut<[usize; N]> for TensorAccessorMut<'_, T, N> {
    #[track_caller]
    fn index_mut(&mut self, index: [usize; N]) -> &mut Self::Output {
        self.get_mut(index).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Device, ElementType, Error, Tensor};

    #[test]
    fn accessor_follows_strides() {
        let mut tensor =
            Tensor::with_shape_and_strides(&[2, 3], &[1, 2], ElementType::Int32, Device::Cpu)
                .unwrap();
        {
            let mut accessor = tensor.accessor_mut::<i32, 2>().unwrap();
            for i in 0..2 {
                for j in 0..3 {
                    accessor[[i, j]] = (i * 10 + j) as i32;
                }
            }
            assert_eq!(accessor.get([2, 0]), None);
        }
        assert_eq!(&*tensor.data::<i32>().unwrap(), &[0, 10, 1, 11, 2, 12]);

        let accessor = tensor.accessor::<i32, 2>().unwrap();
        assert_eq!(accessor[[1, 2]], 12);
        assert_eq!(accessor.get([0, 3]), None);
    }

    #[test]
    fn one_dimensional_index() {
        let mut tensor = Tensor::with_shape(&[4], ElementType::UInt8, Device::Cpu).unwrap();
        let mut accessor = tensor.accessor_mut::<u8, 1>().unwrap();
        accessor[3] = 200;
        assert_eq!(accessor[3], 200);
        assert_eq!(accessor[0], 0);
    }

    #[test]
    fn scalar_accessor() {
        let tensor = Tensor::scalar(8i64);
        let accessor = tensor.accessor::<i64, 0>().unwrap();
        assert_eq!(accessor[[]], 8);
    }

    #[test]
    fn rank_mismatch() {
        let tensor = Tensor::with_shape(&[2, 2], ElementType::Float, Device::Cpu).unwrap();
        assert_eq!(
            tensor.accessor::<f32, 3>().err(),
            Some(Error::RankMismatch {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            tensor.accessor::<f64, 2>().err(),
            Some(Error::TypeMismatch {
                expected: ElementType::Float,
                actual: ElementType::Double
            })
        );
    }
}
