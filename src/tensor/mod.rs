//! The runtime-typed tensor handle.
//!
//! A [`Tensor`] is a handle to a strided array whose element type and device are chosen at runtime. The handle
//! carries two tags, an [`ElementType`] and a [`Device`], and an optional reference-counted storage holding the
//! backend array for exactly that pair. Every shape query, resize and element access is routed through
//! [`dispatch`](crate::dispatch::dispatch) to the backend instantiation selected by the tags.
//!
//! A handle is in one of three states:
//! - Empty: no device and no storage, the state of [`Tensor::new`] and of a handle after [`Tensor::clear`] or
//!     [`Tensor::take`].
//! - Allocated: a device, an element type and a storage of some rank.
//! - Scalar: an allocated handle holding a single value, reported as zero-dimensional.
//!
//! Handles share storage cheaply: [`Clone`] and [`Tensor::share_from`] produce aliases that observe each other's
//! writes. An independent copy is made with [`Tensor::copy_from`] or one of the cast methods. Resizing always
//! allocates fresh storage, so it never affects other handles that shared the previous storage.
//!
//! The handle is not [`Send`]: aliases share their storage through a non-atomic reference count.

mod accessor;
#[cfg(feature = "ndarray")]
mod array;
mod convert;
mod device;
mod element;
mod fmt;
mod storage;

use std::cell::{Ref, RefCell, RefMut};
use std::marker::PhantomData;

use xt_backend::{contiguous_strides, Backend, Cpu, Element, HostArray, RawArray};

use crate::dispatch::dispatch;
use crate::{Error, Result};

pub use accessor::{TensorAccessor, TensorAccessorMut};
#[cfg(feature = "ndarray")]
pub use array::TensorArrayView;
pub use device::Device;
pub use element::ElementType;

pub use storage::RawArrayMut;

use storage::{Allocate, DataMutPtr, DataPtr, Storage, StorageLayout};

/// Backend layout of a scalar.
const SCALAR_LAYOUT: &[i64] = &[1];

/// A handle to a strided array of runtime element type and device.
///
/// See the [module documentation](self) for the states of a handle and the sharing rules.
///
/// Cloning a tensor does not copy its elements: the clone aliases the same storage.
///
/// Layout queries such as [`dim`](Tensor::dim) or [`sizes`](Tensor::sizes) never borrow the elements, so they keep
/// working while an alias holds a [`data_mut`](Tensor::data_mut) or [`raw_mut`](Tensor::raw_mut) borrow.
#[derive(Clone)]
pub struct Tensor {
    element_type: ElementType,
    device: Device,
    is_scalar: bool,
    storage: Option<Storage>,
}

impl Default for Tensor {
    fn default() -> Self {
        Self {
            element_type: ElementType::Double,
            device: Device::Unknown,
            is_scalar: false,
            storage: None,
        }
    }
}

impl Tensor {
    /// Create an empty tensor, with no device and no storage.
    ///
    /// The element type of an empty tensor is [`ElementType::Double`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tensor of the given type and device with a rank-zero storage holding no elements.
    pub fn typed(element_type: ElementType, device: Device) -> Result<Self> {
        let mut tensor = Self::new();
        tensor.resize_typed(element_type, device)?;
        Ok(tensor)
    }

    /// Create a zeroed tensor of the given shape, with row-major strides.
    ///
    /// An empty `sizes` creates a scalar.
    pub fn with_shape(sizes: &[i64], element_type: ElementType, device: Device) -> Result<Self> {
        let mut tensor = Self::new();
        tensor.reshape_to(sizes, element_type, device)?;
        Ok(tensor)
    }

    /// Create a zeroed tensor with the given sizes and strides.
    pub fn with_shape_and_strides(
        sizes: &[i64],
        strides: &[i64],
        element_type: ElementType,
        device: Device,
    ) -> Result<Self> {
        let mut tensor = Self::new();
        tensor.reshape_with_strides_to(sizes, strides, element_type, device)?;
        Ok(tensor)
    }

    /// Create a host scalar holding `value`.
    pub fn scalar<T: Element>(value: T) -> Self {
        Self {
            element_type: ElementType::of::<T>(),
            device: Device::Cpu,
            is_scalar: true,
            storage: Some(Storage::new::<Cpu, T>(HostArray::scalar(value))),
        }
    }

    /// Create a scalar holding `value` on the given device.
    pub fn scalar_on<T: Element>(value: T, device: Device) -> Result<Self> {
        let mut tensor = Self::new();
        tensor.set_value_on(value, device)?;
        Ok(tensor)
    }

    /// Make this handle an alias of `other`, sharing its storage.
    ///
    /// The previous storage of this handle is released.
    pub fn share_from(&mut self, other: &Tensor) {
        *self = other.clone();
    }

    /// Move the contents out of this handle, leaving it empty.
    pub fn take(&mut self) -> Tensor {
        std::mem::take(self)
    }

    /// Release the storage and reset the handle to the empty state.
    pub fn clear(&mut self) {
        if let Some(storage) = self.storage.take() {
            crate::log::trace!(
                "Releasing {} storage on {}, {} handles left",
                self.element_type,
                self.device,
                storage.use_count() - 1
            );
        }
        *self = Self::default();
    }

    /// Replace the storage with a fresh rank-zero storage of the same type and device.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnsupportedDevice`] if the handle is empty.
    pub fn empty(&mut self) -> Result<()> {
        self.resize_typed(self.element_type, self.device)
    }

    /// Replace the storage with a fresh rank-zero storage of the given type and device.
    ///
    /// On failure the handle is left unchanged.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnsupportedDevice`] if the device is unknown or not compiled in.
    pub fn resize_typed(&mut self, element_type: ElementType, device: Device) -> Result<()> {
        self.install(element_type, device, None, false)
    }

    /// Replace the storage with a fresh zeroed storage of the given sizes, with row-major strides.
    ///
    /// The element type and the device are kept. An empty `sizes` makes the handle a scalar. Other handles sharing
    /// the previous storage are not affected.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NonPositiveSize`] if a size is not positive, and with [`Error::UnsupportedDevice`] if the
    /// handle is empty.
    pub fn resize(&mut self, sizes: &[i64]) -> Result<()> {
        self.check_has_device()?;
        self.reshape_to(sizes, self.element_type, self.device)
    }

    /// Replace the storage with a fresh zeroed storage of the given sizes and strides.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::ShapeStrideMismatch`] if the two sequences differ in length, with
    /// [`Error::NonPositiveSize`] or [`Error::NegativeStride`] for invalid entries, and with
    /// [`Error::UnsupportedDevice`] if the handle is empty.
    pub fn resize_with_strides(&mut self, sizes: &[i64], strides: &[i64]) -> Result<()> {
        self.check_has_device()?;
        self.reshape_with_strides_to(sizes, strides, self.element_type, self.device)
    }

    /// Resize to the sizes of `other`, keeping the element type and device of this handle.
    ///
    /// The strides are row-major regardless of the strides of `other`.
    pub fn resize_as(&mut self, other: &Tensor) -> Result<()> {
        self.resize_as_impl(other, self.element_type, self.device)
    }

    /// Resize to the sizes of `other`, also taking its element type and device.
    pub fn resize_as_with_type(&mut self, other: &Tensor) -> Result<()> {
        self.resize_as_impl(other, other.element_type, other.device)
    }

    fn resize_as_impl(
        &mut self,
        other: &Tensor,
        element_type: ElementType,
        device: Device,
    ) -> Result<()> {
        if other.dim() < 0 {
            return self.resize_typed(element_type, device);
        }
        self.reshape_to(&other.sizes(), element_type, device)
    }

    /// Replace the storage with a fresh zeroed storage of the given sizes, type and device.
    pub fn reshape_to(
        &mut self,
        sizes: &[i64],
        element_type: ElementType,
        device: Device,
    ) -> Result<()> {
        check_sizes(sizes)?;
        let strides = contiguous_strides(sizes).map_err(|err| {
            crate::log::error!("Invalid sizes {sizes:?}: {err}");
            Error::from(err)
        })?;
        self.reshape_with_strides_to(sizes, &strides, element_type, device)
    }

    /// Replace the storage with a fresh zeroed storage of the given sizes, strides, type and device.
    pub fn reshape_with_strides_to(
        &mut self,
        sizes: &[i64],
        strides: &[i64],
        element_type: ElementType,
        device: Device,
    ) -> Result<()> {
        if sizes.len() != strides.len() {
            crate::log::error!(
                "Got {} sizes but {} strides",
                sizes.len(),
                strides.len()
            );
            return Err(Error::ShapeStrideMismatch {
                sizes: sizes.len(),
                strides: strides.len(),
            });
        }
        check_sizes(sizes)?;
        if let Some((dim, &stride)) = strides.iter().enumerate().find(|&(_, &s)| s < 0) {
            crate::log::error!("Invalid strides {strides:?}");
            return Err(Error::NegativeStride { dim, stride });
        }

        if sizes.is_empty() {
            self.install(
                element_type,
                device,
                Some((SCALAR_LAYOUT, SCALAR_LAYOUT)),
                true,
            )
        } else {
            self.install(element_type, device, Some((sizes, strides)), false)
        }
    }

    /// Mark a one-dimensional tensor of a single element as a scalar.
    ///
    /// Only the flag of this handle changes; the storage and its aliases are untouched.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NotConvertibleToScalar`] unless the tensor is a scalar already or has rank one and size
    /// one.
    pub fn to_scalar(&mut self) -> Result<()> {
        if self.is_scalar {
            return Ok(());
        }
        if self.dim() != 1 || self.sizes()[0] != 1 {
            return Err(Error::NotConvertibleToScalar);
        }
        self.is_scalar = true;
        Ok(())
    }

    fn install(
        &mut self,
        element_type: ElementType,
        device: Device,
        layout: Option<(&[i64], &[i64])>,
        is_scalar: bool,
    ) -> Result<()> {
        let storage = dispatch(Allocate { layout }, (element_type, device))?;
        crate::log::trace!(
            "Allocated {element_type} storage on {device}, layout {:?}",
            layout
        );
        self.replace(element_type, device, is_scalar, storage);
        Ok(())
    }

    fn replace(
        &mut self,
        element_type: ElementType,
        device: Device,
        is_scalar: bool,
        storage: Storage,
    ) {
        self.clear();
        *self = Self {
            element_type,
            device,
            is_scalar,
            storage: Some(storage),
        };
    }

    fn check_has_device(&self) -> Result<()> {
        if self.device == Device::Unknown {
            crate::log::error!("Resize of a tensor without a device");
            return Err(Error::UnsupportedDevice(Device::Unknown));
        }
        Ok(())
    }

    /// The element type.
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// The device.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Whether the handle holds a scalar.
    pub fn is_scalar(&self) -> bool {
        self.is_scalar
    }

    /// Whether the handle is empty, with no device and no storage.
    pub fn is_empty(&self) -> bool {
        self.storage.is_none()
    }

    /// The number of dimensions.
    ///
    /// `-1` for an empty handle or a rank-zero storage, `0` for a scalar.
    pub fn dim(&self) -> i64 {
        match self.storage_layout() {
            None => -1,
            Some(_) if self.is_scalar => 0,
            Some(layout) if layout.sizes.is_empty() => -1,
            Some(layout) => layout.sizes.len() as i64,
        }
    }

    /// The size of dimension `dim`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::DimOutOfRange`] unless `0 <= dim < self.dim()`, in particular for empty handles and
    /// scalars.
    pub fn size_at(&self, dim: i64) -> Result<i64> {
        let index = self.check_dim(dim)?;
        Ok(self.sizes()[index])
    }

    /// The size of every dimension, empty for a scalar or an empty handle.
    pub fn sizes(&self) -> Vec<i64> {
        match self.storage_layout() {
            Some(layout) if !self.is_scalar => layout.sizes.clone(),
            _ => Vec::new(),
        }
    }

    /// The stride of dimension `dim`, in elements.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::DimOutOfRange`] unless `0 <= dim < self.dim()`.
    pub fn stride_at(&self, dim: i64) -> Result<i64> {
        let index = self.check_dim(dim)?;
        Ok(self.strides()[index])
    }

    /// The stride of every dimension, empty for a scalar or an empty handle.
    pub fn strides(&self) -> Vec<i64> {
        match self.storage_layout() {
            Some(layout) if !self.is_scalar => layout.strides.clone(),
            _ => Vec::new(),
        }
    }

    fn check_dim(&self, dim: i64) -> Result<usize> {
        let rank = self.dim();
        if dim < 0 || dim >= rank {
            crate::log::error!("Dim {dim} out of range for a tensor of rank {rank}");
            return Err(Error::DimOutOfRange { dim, rank });
        }
        Ok(dim as usize)
    }

    /// Offset of the first element in the storage, `0` for an empty handle.
    pub fn offset(&self) -> i64 {
        self.storage_layout().map_or(0, |layout| layout.offset)
    }

    /// Number of elements: `0` for an empty handle or a rank-zero storage, `1` for a scalar.
    pub fn numel(&self) -> usize {
        self.storage_layout().map_or(0, |layout| layout.numel)
    }

    /// Size of a single element in bytes.
    pub fn element_size(&self) -> usize {
        self.element_type.element_size()
    }

    /// Number of bytes spanned by the logical elements, `numel() * element_size()`.
    pub fn nbytes(&self) -> usize {
        self.numel() * self.element_size()
    }

    /// Whether the strides are row-major, ignoring dimensions of size one. `false` for an empty handle.
    pub fn is_contiguous(&self) -> bool {
        self.storage_layout()
            .is_some_and(|layout| layout.is_contiguous)
    }

    /// Number of handles sharing the storage, `0` for an empty handle.
    pub fn use_count(&self) -> usize {
        self.storage.as_ref().map_or(0, Storage::use_count)
    }

    /// Whether both handles share the same storage.
    pub fn shares_storage_with(&self, other: &Tensor) -> bool {
        match (&self.storage, &other.storage) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Name of the element type, or `"unknown"` for an empty handle.
    pub fn type_desc(&self) -> &'static str {
        if self.is_empty() {
            return "unknown";
        }
        self.element_type.name()
    }

    /// Name of the device.
    pub fn device_desc(&self) -> &'static str {
        self.device.name()
    }

    fn storage_layout(&self) -> Option<Ref<'_, StorageLayout>> {
        self.storage.as_ref().map(Storage::layout)
    }

    /// Borrow the backend array of the storage.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::DeviceMismatch`] or [`Error::TypeMismatch`] if `B` or `T` do not match the tags of the
    /// handle, and with [`Error::StorageBorrowed`] if the storage is mutably borrowed.
    pub fn raw<B: Backend, T: Element>(&self) -> Result<Ref<'_, B::Array<T>>> {
        self.cell::<B, T>()?
            .try_borrow()
            .map_err(|_| Error::StorageBorrowed)
    }

    /// Mutably borrow the backend array of the storage.
    ///
    /// Writes are observed by every handle sharing the storage. A kernel may also resize the array in place; the
    /// new layout is reported by every alias once the returned guard is dropped.
    pub fn raw_mut<B: Backend, T: Element>(&mut self) -> Result<RawArrayMut<'_, B, T>> {
        let array = self
            .cell::<B, T>()?
            .try_borrow_mut()
            .map_err(|_| Error::StorageBorrowed)?;
        match &self.storage {
            Some(storage) => Ok(storage.guard::<B, T>(array)),
            None => Err(Error::UnsupportedDevice(Device::Unknown)),
        }
    }

    fn cell<B: Backend, T: Element>(&self) -> Result<&RefCell<B::Array<T>>> {
        let device = Device::of::<B>();
        if device != self.device {
            return Err(Error::DeviceMismatch {
                expected: self.device,
                actual: device,
            });
        }
        let element_type = ElementType::of::<T>();
        let mismatch = Error::TypeMismatch {
            expected: self.element_type,
            actual: element_type,
        };
        if element_type != self.element_type {
            return Err(mismatch);
        }
        self.storage
            .as_ref()
            .and_then(Storage::cell::<B, T>)
            .ok_or(mismatch)
    }

    /// Pointer to the first element of the storage.
    ///
    /// The pointer stays valid while any handle keeps the storage alive.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::TypeMismatch`] if `T` is not the element type, and with [`Error::UnsupportedDevice`] for
    /// an empty handle.
    pub fn data_ptr<T: Element>(&self) -> Result<*const T> {
        dispatch(DataPtr(PhantomData::<T>), self)
    }

    /// Mutable pointer to the first element of the storage.
    pub fn data_mut_ptr<T: Element>(&mut self) -> Result<*mut T> {
        dispatch(DataMutPtr(PhantomData::<T>), self)
    }

    /// Borrow the storage buffer of a host tensor.
    ///
    /// The slice is the whole storage, laid out according to [`strides`](Tensor::strides) from
    /// [`offset`](Tensor::offset).
    ///
    /// # Errors
    ///
    /// Fails with [`Error::DeviceMismatch`] if the tensor is not on the host, with [`Error::TypeMismatch`] if `T` is
    /// not the element type, and with [`Error::StorageBorrowed`] if the storage is mutably borrowed.
    pub fn data<T: Element>(&self) -> Result<Ref<'_, [T]>> {
        let array = self.raw::<Cpu, T>()?;
        Ok(Ref::map(array, |array| array.as_slice()))
    }

    /// Mutably borrow the storage buffer of a host tensor.
    pub fn data_mut<T: Element>(&mut self) -> Result<RefMut<'_, [T]>> {
        let array = self
            .cell::<Cpu, T>()?
            .try_borrow_mut()
            .map_err(|_| Error::StorageBorrowed)?;
        Ok(RefMut::map(array, |array| array.as_mut_slice()))
    }

    /// Get an accessor of a host tensor of rank `N`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::RankMismatch`] if the tensor has `dim() != N`, and otherwise as [`data`](Tensor::data).
    pub fn accessor<T: Element, const N: usize>(&self) -> Result<TensorAccessor<'_, T, N>> {
        let layout = self.accessor_layout::<N>()?;
        Ok(TensorAccessor::new(self.data::<T>()?, layout))
    }

    /// Get a mutable accessor of a host tensor of rank `N`.
    pub fn accessor_mut<T: Element, const N: usize>(
        &mut self,
    ) -> Result<TensorAccessorMut<'_, T, N>> {
        let layout = self.accessor_layout::<N>()?;
        Ok(TensorAccessorMut::new(self.data_mut::<T>()?, layout))
    }

    fn accessor_layout<const N: usize>(&self) -> Result<accessor::AccessorLayout<N>> {
        let rank = self.dim().max(0);
        accessor::AccessorLayout::new(&self.sizes(), &self.strides(), self.offset()).ok_or(
            Error::RankMismatch {
                expected: N as i64,
                actual: rank,
            },
        )
    }
}

fn check_sizes(sizes: &[i64]) -> Result<()> {
    if let Some((dim, &size)) = sizes.iter().enumerate().find(|&(_, &s)| s <= 0) {
        crate::log::error!("Invalid sizes {sizes:?}");
        return Err(Error::NonPositiveSize { dim, size });
    }
    Ok(())
}

impl<T: Element> From<T> for Tensor {
    fn from(value: T) -> Self {
        Tensor::scalar(value)
    }
}
