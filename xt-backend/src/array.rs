//! Strided arrays and the operations every backend array provides.

use crate::{BackendError, Element};

/// The storage primitives of a backend, for a single element type.
///
/// An array has a rank, a size and a stride per dimension, and a storage offset. A freshly created array has rank
/// zero and holds no elements; [`resize`](RawArray::resize) gives it a layout and zeroed storage.
pub trait RawArray<T: Element>: Default + 'static {
    /// Create a one-dimensional array of a single element.
    fn scalar(value: T) -> Self;

    /// Discard the current storage and allocate zeroed storage for the given layout.
    ///
    /// The allocation covers every element reachable by the layout, `1 + Σ (size[i] - 1) * stride[i]`.
    fn resize(&mut self, sizes: &[i64], strides: &[i64]) -> Result<(), BackendError>;

    /// The size of every dimension.
    fn sizes(&self) -> &[i64];

    /// The stride of every dimension, in elements.
    fn strides(&self) -> &[i64];

    /// Offset of the first element in the storage, in elements.
    fn storage_offset(&self) -> i64;

    /// Number of logical elements, zero for a rank-zero array.
    fn numel(&self) -> usize;

    /// Whether the strides are the row-major strides of the sizes.
    ///
    /// Dimensions of size one are ignored.
    fn is_contiguous(&self) -> bool;

    /// Pointer to the first element of the storage.
    fn data_ptr(&self) -> *const T;

    /// Mutable pointer to the first element of the storage.
    fn data_mut_ptr(&mut self) -> *mut T;

    /// Read element `index` of a one-dimensional array.
    fn get1d(&self, index: i64) -> Result<T, BackendError>;

    /// Write element `index` of a one-dimensional array.
    fn set1d(&mut self, index: i64, value: T) -> Result<(), BackendError>;

    /// Read every element in row-major logical order.
    fn read_logical(&self) -> Vec<T>;

    /// Overwrite elements in row-major logical order, stopping at whichever of the array or the values ends first.
    fn write_logical<I: IntoIterator<Item = T>>(&mut self, values: I);

    /// Number of dimensions.
    fn n_dimension(&self) -> usize {
        self.sizes().len()
    }

    /// Size of dimension `dim`, if it exists.
    fn size(&self, dim: usize) -> Option<i64> {
        self.sizes().get(dim).copied()
    }

    /// Stride of dimension `dim`, if it exists.
    fn stride(&self, dim: usize) -> Option<i64> {
        self.strides().get(dim).copied()
    }
}

/// Copy the logical elements of `src` into `dst`, converting between element types.
///
/// Both arrays must hold the same number of elements; their shapes may differ.
pub fn copy<D, S, AD, AS>(dst: &mut AD, src: &AS) -> Result<(), BackendError>
where
    D: Element,
    S: Element,
    AD: RawArray<D>,
    AS: RawArray<S>,
{
    if dst.numel() != src.numel() {
        return Err(BackendError::NumelMismatch {
            dst: dst.numel(),
            src: src.numel(),
        });
    }
    let values = src.read_logical();
    dst.write_logical(values.into_iter().map(|v| v.into_value().cast::<D>()));
    Ok(())
}

/// Row-major strides of the given sizes.
///
/// Fails with [`BackendError::SizeOverflow`] if a stride does not fit in an `i64`.
pub fn contiguous_strides(sizes: &[i64]) -> Result<Vec<i64>, BackendError> {
    let mut strides = vec![1i64; sizes.len()];
    for i in (0..sizes.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1]
            .checked_mul(sizes[i + 1].max(1))
            .ok_or(BackendError::SizeOverflow)?;
    }
    Ok(strides)
}

/// A strided array living in host memory.
#[derive(Debug, Default)]
pub struct HostArray<T> {
    data: Vec<T>,
    sizes: Vec<i64>,
    strides: Vec<i64>,
    offset: i64,
    numel: usize,
}
impl<T: Element> HostArray<T> {
    /// The whole storage buffer, laid out according to the strides.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The whole storage buffer, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Storage positions of the logical elements, in row-major order.
    pub fn logical_offsets(&self) -> LogicalOffsets<'_> {
        LogicalOffsets::new(&self.sizes, &self.strides, self.offset)
    }

    fn position_1d(&self, index: i64) -> Result<usize, BackendError> {
        if self.sizes.len() != 1 {
            return Err(BackendError::NotOneDimensional {
                rank: self.sizes.len(),
            });
        }
        if index < 0 || index >= self.sizes[0] {
            return Err(BackendError::IndexOutOfRange {
                index,
                len: self.sizes[0],
            });
        }
        Ok((self.offset + index * self.strides[0]) as usize)
    }
}

impl<T: Element> RawArray<T> for HostArray<T> {
    fn scalar(value: T) -> Self {
        Self {
            data: vec![value],
            sizes: vec![1],
            strides: vec![1],
            offset: 0,
            numel: 1,
        }
    }

    fn resize(&mut self, sizes: &[i64], strides: &[i64]) -> Result<(), BackendError> {
        let layout = Layout::validate(sizes, strides, std::mem::size_of::<T>())?;
        log::trace!(
            "Allocating {} {} elements for sizes {:?}",
            layout.storage_len,
            T::NAME,
            sizes
        );
        let mut data = Vec::new();
        data.try_reserve_exact(layout.storage_len)
            .map_err(|_| BackendError::AllocationFailed {
                bytes: layout.storage_len * std::mem::size_of::<T>(),
            })?;
        data.resize(layout.storage_len, T::default());
        self.data = data;
        self.sizes = sizes.to_vec();
        self.strides = strides.to_vec();
        self.offset = 0;
        self.numel = layout.numel;
        Ok(())
    }

    fn sizes(&self) -> &[i64] {
        &self.sizes
    }

    fn strides(&self) -> &[i64] {
        &self.strides
    }

    fn storage_offset(&self) -> i64 {
        self.offset
    }

    fn numel(&self) -> usize {
        self.numel
    }

    fn is_contiguous(&self) -> bool {
        let mut expected = 1;
        for (&size, &stride) in self.sizes.iter().zip(&self.strides).rev() {
            if size != 1 {
                if stride != expected {
                    return false;
                }
                expected = expected.saturating_mul(size);
            }
        }
        true
    }

    fn data_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    fn data_mut_ptr(&mut self) -> *mut T {
        self.data.as_mut_ptr()
    }

    fn get1d(&self, index: i64) -> Result<T, BackendError> {
        let position = self.position_1d(index)?;
        Ok(self.data[position])
    }

    fn set1d(&mut self, index: i64, value: T) -> Result<(), BackendError> {
        let position = self.position_1d(index)?;
        self.data[position] = value;
        Ok(())
    }

    fn read_logical(&self) -> Vec<T> {
        self.logical_offsets().map(|i| self.data[i]).collect()
    }

    fn write_logical<I: IntoIterator<Item = T>>(&mut self, values: I) {
        let Self {
            data,
            sizes,
            strides,
            offset,
            ..
        } = self;
        for (position, value) in LogicalOffsets::new(sizes, strides, *offset).zip(values) {
            data[position] = value;
        }
    }
}

struct Layout {
    numel: usize,
    storage_len: usize,
}
impl Layout {
    /// Both the logical elements and the storage must fit in `isize::MAX` bytes.
    fn validate(sizes: &[i64], strides: &[i64], element_size: usize) -> Result<Self, BackendError> {
        if sizes.len() != strides.len() {
            return Err(BackendError::ShapeStrideMismatch {
                sizes: sizes.len(),
                strides: strides.len(),
            });
        }
        if let Some((dim, &size)) = sizes.iter().enumerate().find(|&(_, &s)| s < 0) {
            return Err(BackendError::NegativeSize { dim, size });
        }
        if let Some((dim, &stride)) = strides.iter().enumerate().find(|&(_, &s)| s < 0) {
            return Err(BackendError::NegativeStride { dim, stride });
        }
        if sizes.is_empty() || sizes.contains(&0) {
            return Ok(Self {
                numel: 0,
                storage_len: 0,
            });
        }

        let mut numel = 1usize;
        let mut last = 0i64;
        for (&size, &stride) in sizes.iter().zip(strides) {
            numel = usize::try_from(size)
                .ok()
                .and_then(|size| numel.checked_mul(size))
                .ok_or(BackendError::SizeOverflow)?;
            last = (size - 1)
                .checked_mul(stride)
                .and_then(|span| last.checked_add(span))
                .ok_or(BackendError::SizeOverflow)?;
        }
        let storage_len = last
            .checked_add(1)
            .and_then(|len| usize::try_from(len).ok())
            .ok_or(BackendError::SizeOverflow)?;
        let max_elements = isize::MAX as usize / element_size.max(1);
        if numel > max_elements || storage_len > max_elements {
            return Err(BackendError::SizeOverflow);
        }
        Ok(Self { numel, storage_len })
    }
}

/// Iterator over the storage positions of the logical elements of a strided layout, in row-major order.
pub struct LogicalOffsets<'a> {
    sizes: &'a [i64],
    strides: &'a [i64],
    index: Vec<i64>,
    next: Option<i64>,
}
impl<'a> LogicalOffsets<'a> {
    fn new(sizes: &'a [i64], strides: &'a [i64], offset: i64) -> Self {
        let empty = sizes.is_empty() || sizes.iter().any(|&s| s <= 0);
        Self {
            sizes,
            strides,
            index: vec![0; sizes.len()],
            next: (!empty).then_some(offset),
        }
    }
}
impl Iterator for LogicalOffsets<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.next = None;
        let mut position = current;
        for dim in (0..self.sizes.len()).rev() {
            self.index[dim] += 1;
            position += self.strides[dim];
            if self.index[dim] < self.sizes[dim] {
                self.next = Some(position);
                break;
            }
            position -= self.strides[dim] * self.sizes[dim];
            self.index[dim] = 0;
        }
        Some(current as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array<T: Element>(sizes: &[i64], strides: &[i64]) -> HostArray<T> {
        let mut array = HostArray::<T>::default();
        array.resize(sizes, strides).unwrap();
        array
    }

    #[test]
    fn fresh_array_is_empty() {
        let array = HostArray::<f32>::default();
        assert_eq!(array.n_dimension(), 0);
        assert_eq!(array.numel(), 0);
        assert!(array.read_logical().is_empty());
        assert_eq!(array.size(0), None);
    }

    #[test]
    fn resize_allocates_zeroed_storage() {
        let array = array::<i32>(&[2, 3], &[3, 1]);
        assert_eq!(array.sizes(), &[2, 3]);
        assert_eq!(array.strides(), &[3, 1]);
        assert_eq!(array.numel(), 6);
        assert_eq!(array.as_slice(), &[0; 6]);
        assert!(array.is_contiguous());
        assert_eq!(array.storage_offset(), 0);
    }

    #[test]
    fn resize_covers_strided_layout() {
        let array = array::<u8>(&[2, 3], &[10, 2]);
        assert_eq!(array.as_slice().len(), 1 + 10 + 2 * 2);
        assert_eq!(array.numel(), 6);
        assert!(!array.is_contiguous());
        let offsets = array.logical_offsets().collect::<Vec<_>>();
        assert_eq!(offsets, vec![0, 2, 4, 10, 12, 14]);
    }

    #[test]
    fn resize_broadcast_layout() {
        let array = array::<f64>(&[4, 3], &[0, 1]);
        assert_eq!(array.as_slice().len(), 3);
        assert_eq!(array.numel(), 12);
        assert_eq!(array.read_logical().len(), 12);
    }

    #[test]
    fn resize_rejects_invalid_layouts() {
        let mut array = HostArray::<i64>::default();
        assert_eq!(
            array.resize(&[2, 3], &[1]),
            Err(BackendError::ShapeStrideMismatch { sizes: 2, strides: 1 })
        );
        assert_eq!(
            array.resize(&[2, -3], &[3, 1]),
            Err(BackendError::NegativeSize { dim: 1, size: -3 })
        );
        assert_eq!(
            array.resize(&[2, 3], &[-3, 1]),
            Err(BackendError::NegativeStride { dim: 0, stride: -3 })
        );
        assert_eq!(
            array.resize(&[i64::MAX, 3], &[i64::MAX, 1]),
            Err(BackendError::SizeOverflow)
        );
        assert_eq!(array.n_dimension(), 0);
    }

    #[test]
    fn resize_rejects_unallocatable_layouts() {
        let mut array = HostArray::<f64>::default();
        assert_eq!(array.resize(&[1 << 61], &[1]), Err(BackendError::SizeOverflow));
        // a single stored element, but too many logical ones to read out
        assert_eq!(array.resize(&[1 << 61], &[0]), Err(BackendError::SizeOverflow));

        let mut bytes = HostArray::<u8>::default();
        assert_eq!(
            bytes.resize(&[i64::MAX / 2 + 1, 2], &[2, 1]),
            Err(BackendError::SizeOverflow)
        );
        assert_eq!(bytes.n_dimension(), 0);
    }

    #[test]
    fn one_dimensional_access() {
        let mut array = array::<i16>(&[4], &[2]);
        array.set1d(3, -7).unwrap();
        assert_eq!(array.get1d(3), Ok(-7));
        assert_eq!(array.as_slice()[6], -7);
        assert_eq!(
            array.get1d(4),
            Err(BackendError::IndexOutOfRange { index: 4, len: 4 })
        );
        assert_eq!(
            array.set1d(-1, 0),
            Err(BackendError::IndexOutOfRange { index: -1, len: 4 })
        );

        let matrix = self::array::<i16>(&[2, 2], &[2, 1]);
        assert_eq!(matrix.get1d(0), Err(BackendError::NotOneDimensional { rank: 2 }));
    }

    #[test]
    fn scalar_array() {
        let array = HostArray::scalar(2.5f32);
        assert_eq!(array.sizes(), &[1]);
        assert_eq!(array.strides(), &[1]);
        assert_eq!(array.get1d(0), Ok(2.5));
    }

    #[test]
    fn copy_converts_and_relayouts() {
        let mut src = array::<f64>(&[2, 3], &[3, 1]);
        src.write_logical([0.5, 1.5, 2.5, -1.0, 300.0, 7.9]);

        let mut dst = array::<u8>(&[3, 2], &[1, 3]);
        copy(&mut dst, &src).unwrap();
        assert_eq!(dst.read_logical(), vec![0, 1, 2, 0, 255, 7]);
        assert_eq!(dst.as_slice(), &[0, 2, 255, 1, 0, 7]);

        let mut short = array::<u8>(&[5], &[1]);
        assert_eq!(
            copy(&mut short, &src),
            Err(BackendError::NumelMismatch { dst: 5, src: 6 })
        );
    }

    #[test]
    fn contiguous_strides_of_sizes() {
        assert_eq!(contiguous_strides(&[2, 3, 4]), Ok(vec![12, 4, 1]));
        assert_eq!(contiguous_strides(&[5]), Ok(vec![1]));
        assert_eq!(contiguous_strides(&[]), Ok(vec![]));
        assert_eq!(
            contiguous_strides(&[2, 1 << 62, 4]),
            Err(BackendError::SizeOverflow)
        );
    }
}
