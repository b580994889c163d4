use std::marker::PhantomData;

use xt_backend::Element;

use super::storage::{AllocateScalar, CopyInto, GetValue, Values};
use super::{Device, ElementType, Tensor};
use crate::dispatch::dispatch;
use crate::{Error, Result};

impl Tensor {
    /// Read the value of a scalar, converted to `T` with the semantics of an `as` cast.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NotAScalar`] if the handle does not hold a scalar.
    pub fn value<T: Element>(&self) -> Result<T> {
        if !self.is_scalar {
            crate::log::error!("Scalar read of a tensor of rank {}", self.dim());
            return Err(Error::NotAScalar);
        }
        dispatch(GetValue(PhantomData::<T>), self)
    }

    /// Make the handle a host scalar of type `T` holding `value`.
    ///
    /// The scalar lives on the host whatever the previous device of the handle; use
    /// [`set_value_on`](Tensor::set_value_on) for another device. Other handles sharing the previous storage are not
    /// affected.
    pub fn set_value<T: Element>(&mut self, value: T) -> Result<()> {
        self.set_value_on(value, Device::Cpu)
    }

    /// Make the handle a scalar of type `T` holding `value` on the given device.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnsupportedDevice`] if the device is unknown or not compiled in, leaving the handle
    /// unchanged.
    pub fn set_value_on<T: Element>(&mut self, value: T, device: Device) -> Result<()> {
        let element_type = ElementType::of::<T>();
        let storage = dispatch(
            AllocateScalar(value.into_value()),
            (element_type, device),
        )?;
        self.replace(element_type, device, true, storage);
        Ok(())
    }

    /// Copy the elements of `src` into the storage of this handle, converting between element types.
    ///
    /// Elements are matched in row-major logical order, so the shapes may differ as long as the element counts are
    /// equal. The storage, tags and shape of this handle are kept, and every alias observes the new elements.
    /// Copying a storage onto itself is a no-op.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NumelMismatch`] if the element counts differ, and with [`Error::UnsupportedDevice`] if
    /// either handle is empty.
    pub fn copy_from(&mut self, src: &Tensor) -> Result<()> {
        if self.is_empty() || src.is_empty() {
            crate::log::error!("Copy between tensors without a device");
            return Err(Error::UnsupportedDevice(Device::Unknown));
        }
        if self.shares_storage_with(src) {
            return Ok(());
        }
        let (dst_numel, src_numel) = (self.numel(), src.numel());
        if dst_numel != src_numel {
            crate::log::error!("Copy of {src_numel} elements into {dst_numel} elements");
            return Err(Error::NumelMismatch {
                dst: dst_numel,
                src: src_numel,
            });
        }
        dispatch(CopyInto { src }, self)
    }

    /// Create an independent copy with elements converted to `T`, on the same device.
    pub fn cast<T: Element>(&self) -> Result<Tensor> {
        self.cast_as(ElementType::of::<T>(), Device::Unknown)
    }

    /// Create an independent copy with elements converted to `T`, on the given device.
    pub fn cast_to<T: Element>(&self, device: Device) -> Result<Tensor> {
        self.cast_as(ElementType::of::<T>(), device)
    }

    /// Create an independent copy with the given element type, on the given device.
    ///
    /// [`Device::Unknown`] keeps the device of this handle. The copy has the sizes of this handle with row-major
    /// strides, and is a scalar if this handle is.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnsupportedDevice`] if this handle is empty or the target device is not compiled in.
    pub fn cast_as(&self, element_type: ElementType, device: Device) -> Result<Tensor> {
        let device = match device {
            Device::Unknown => self.device,
            device => device,
        };
        let mut out = Tensor::typed(element_type, device)?;
        out.resize_as(self)?;
        out.copy_from(self)?;
        Ok(out)
    }

    /// Read every element in row-major logical order, converted to `T`.
    pub fn to_values<T: Element>(&self) -> Result<Vec<T>> {
        self.clone().into_values()
    }

    /// Consume the handle and read every element in row-major logical order, converted to `T`.
    ///
    /// An empty handle yields no elements.
    pub fn into_values<T: Element>(self) -> Result<Vec<T>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        dispatch(Values(PhantomData::<T>), self)
    }
}
