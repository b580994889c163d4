//! Emulated discrete device backend.
//!
//! Arrays of this backend model memory owned by a device: they expose layout queries and element-wise
//! primitives, but no host slices. The device memory is emulated with host allocations.

use crate::{Backend, BackendError, DeviceKind, Element, HostArray, RawArray};

/// Number of devices visible to the process.
pub const DEVICE_COUNT: usize = 1;

/// The discrete device backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gpu;
impl Backend for Gpu {
    const KIND: DeviceKind = DeviceKind::Gpu;
    type Array<T: Element> = Array<T>;
}

/// A strided array resident in device memory.
#[derive(Debug, Default)]
pub struct Array<T>(HostArray<T>);
impl<T: Element> RawArray<T> for Array<T> {
    fn scalar(value: T) -> Self {
        Self(HostArray::scalar(value))
    }
    fn resize(&mut self, sizes: &[i64], strides: &[i64]) -> Result<(), BackendError> {
        self.0.resize(sizes, strides)
    }
    fn sizes(&self) -> &[i64] {
        self.0.sizes()
    }
    fn strides(&self) -> &[i64] {
        self.0.strides()
    }
    fn storage_offset(&self) -> i64 {
        self.0.storage_offset()
    }
    fn numel(&self) -> usize {
        self.0.numel()
    }
    fn is_contiguous(&self) -> bool {
        self.0.is_contiguous()
    }
    fn data_ptr(&self) -> *const T {
        self.0.data_ptr()
    }
    fn data_mut_ptr(&mut self) -> *mut T {
        self.0.data_mut_ptr()
    }
    fn get1d(&self, index: i64) -> Result<T, BackendError> {
        self.0.get1d(index)
    }
    fn set1d(&mut self, index: i64, value: T) -> Result<(), BackendError> {
        self.0.set1d(index, value)
    }
    fn read_logical(&self) -> Vec<T> {
        self.0.read_logical()
    }
    fn write_logical<I: IntoIterator<Item = T>>(&mut self, values: I) {
        self.0.write_logical(values)
    }
}

/// Per-thread state of an opened device.
#[derive(Debug)]
pub struct DeviceHandle {
    ordinal: usize,
}
impl DeviceHandle {
    /// Open the device with the given ordinal.
    pub fn open(ordinal: usize) -> Result<Self, BackendError> {
        if ordinal >= DEVICE_COUNT {
            return Err(BackendError::NoSuchDevice(ordinal));
        }
        log::debug!("Opened device {ordinal}");
        Ok(Self { ordinal })
    }

    /// The ordinal of the device.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
}
