//! Runtime dispatch of generic kernels over the `(element type, device)` tags of a tensor.
//!
//! A kernel is a value implementing [`Kernel`], with one generic entry point per device. For every kernel type the
//! dispatcher monomorphizes each entry point for every element type, building one table of function pointers per
//! device, indexed by the element type ordinal. Dispatching reads the tags of the argument, picks the table of the
//! device and calls the entry of the element type, passing the argument through unchanged.
//!
//! The argument may be a shared reference, a mutable reference or an owned [`Tensor`], a bare pair of tags, or any
//! of those paired with the execution [`Context`]:
//!
//! ```rust
//! use xt::dispatch::{dispatch, DeviceKernel};
//! use xt::{Backend, Device, Element, ElementType, Result, Tensor};
//!
//! struct Sum;
//! impl DeviceKernel<&Tensor> for Sum {
//!     type Output = f64;
//!     fn run<B: Backend, T: Element>(self, tensor: &Tensor) -> Result<f64> {
//!         let values = tensor.to_values::<f64>()?;
//!         Ok(values.iter().sum())
//!     }
//! }
//!
//! let tensor = Tensor::with_shape(&[2, 2], ElementType::Int32, Device::Cpu).unwrap();
//! assert_eq!(dispatch(Sum, &tensor).unwrap(), 0.0);
//! ```

use std::marker::PhantomData;

use xt_backend::{Backend, Cpu, Element};

use crate::context::Context;
use crate::tensor::{Device, ElementType, Tensor};
use crate::{Error, Result};

/// A kernel generic over the element type, with an entry point per device.
///
/// The GPU entry point defaults to failing with [`Error::UnsupportedDevice`], so a kernel implemented only for
/// the host needs only [`cpu`](Kernel::cpu).
///
/// Kernels that treat all devices the same way should implement [`DeviceKernel`] instead, which provides this trait.
pub trait Kernel<A>: Sized {
    /// The value produced by the kernel.
    type Output;

    /// Run the kernel on a host tensor with elements of type `T`.
    fn cpu<T: Element>(self, arg: A) -> Result<Self::Output>;

    /// Run the kernel on a device tensor with elements of type `T`.
    fn gpu<T: Element>(self, arg: A) -> Result<Self::Output> {
        let _ = arg;
        Err(Error::UnsupportedDevice(Device::Gpu))
    }
}

/// A kernel generic over both the backend and the element type.
pub trait DeviceKernel<A>: Sized {
    /// The value produced by the kernel.
    type Output;

    /// Run the kernel on a tensor stored by backend `B` with elements of type `T`.
    fn run<B: Backend, T: Element>(self, arg: A) -> Result<Self::Output>;
}
impl<A, K: DeviceKernel<A>> Kernel<A> for K {
    type Output = K::Output;

    fn cpu<T: Element>(self, arg: A) -> Result<K::Output> {
        self.run::<Cpu, T>(arg)
    }

    #[cfg(feature = "gpu")]
    fn gpu<T: Element>(self, arg: A) -> Result<K::Output> {
        self.run::<xt_backend::Gpu, T>(arg)
    }
}

/// A value whose `(element type, device)` tags select the kernel instantiation to run.
pub trait DispatchKey {
    /// The tags to dispatch on.
    fn dispatch_key(&self) -> (ElementType, Device);

    private_decl! {}
}
impl DispatchKey for &Tensor {
    fn dispatch_key(&self) -> (ElementType, Device) {
        (self.element_type(), self.device())
    }
    private_impl! {}
}
impl DispatchKey for &mut Tensor {
    fn dispatch_key(&self) -> (ElementType, Device) {
        (self.element_type(), self.device())
    }
    private_impl! {}
}
impl DispatchKey for Tensor {
    fn dispatch_key(&self) -> (ElementType, Device) {
        (self.element_type(), self.device())
    }
    private_impl! {}
}
impl DispatchKey for (ElementType, Device) {
    fn dispatch_key(&self) -> (ElementType, Device) {
        *self
    }
    private_impl! {}
}
impl<A: DispatchKey> DispatchKey for (&mut Context, A) {
    fn dispatch_key(&self) -> (ElementType, Device) {
        self.1.dispatch_key()
    }
    private_impl! {}
}

type Entry<K, A> = fn(K, A) -> Result<<K as Kernel<A>>::Output>;

macro_rules! entries {
    ($kernel:ty, $arg:ty, $device:ident) => {
        [
            <$kernel as Kernel<$arg>>::$device::<u8>,
            <$kernel as Kernel<$arg>>::$device::<i8>,
            <$kernel as Kernel<$arg>>::$device::<i16>,
            <$kernel as Kernel<$arg>>::$device::<i32>,
            <$kernel as Kernel<$arg>>::$device::<i64>,
            <$kernel as Kernel<$arg>>::$device::<f32>,
            <$kernel as Kernel<$arg>>::$device::<f64>,
        ]
    };
}

struct Table<K, A>(PhantomData<fn(K, A)>);
impl<A, K: Kernel<A>> Table<K, A> {
    const CPU: [Entry<K, A>; ElementType::COUNT] = entries!(K, A, cpu);
    #[cfg(feature = "gpu")]
    const GPU: [Entry<K, A>; ElementType::COUNT] = entries!(K, A, gpu);
}

/// Run `kernel` on `arg`, instantiated for the element type and device of `arg`.
///
/// # Errors
///
/// Fails with [`Error::UnsupportedDevice`] if the device is [`Device::Unknown`] or is not compiled in, or with
/// whatever error the kernel returns.
pub fn dispatch<A: DispatchKey, K: Kernel<A>>(kernel: K, arg: A) -> Result<K::Output> {
    let (element_type, device) = arg.dispatch_key();
    dispatch_with(element_type, device, kernel, arg)
}

/// Run `kernel` on `arg`, instantiated for the given element type and device.
pub fn dispatch_with<A, K: Kernel<A>>(
    element_type: ElementType,
    device: Device,
    kernel: K,
    arg: A,
) -> Result<K::Output> {
    let index = element_type.ordinal() as usize;
    match device {
        Device::Cpu => Table::<K, A>::CPU[index](kernel, arg),
        Device::Gpu => {
            cfg_if::cfg_if! {
                if #[cfg(feature = "gpu")] {
                    Table::<K, A>::GPU[index](kernel, arg)
                } else {
                    let _ = (kernel, arg);
                    crate::log::error!("Dispatch on {element_type} elements: gpu support is not compiled in");
                    Err(Error::UnsupportedDevice(Device::Gpu))
                }
            }
        }
        Device::Unknown => {
            crate::log::error!("Dispatch on {element_type} elements of a tensor without a device");
            Err(Error::UnsupportedDevice(Device::Unknown))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Name;
    impl DeviceKernel<(ElementType, Device)> for Name {
        type Output = (&'static str, Device);
        fn run<B: Backend, T: Element>(self, _: (ElementType, Device)) -> Result<Self::Output> {
            Ok((T::NAME, Device::of::<B>()))
        }
    }

    struct HostOnly;
    impl Kernel<(ElementType, Device)> for HostOnly {
        type Output = usize;
        fn cpu<T: Element>(self, _: (ElementType, Device)) -> Result<usize> {
            Ok(std::mem::size_of::<T>())
        }
    }

    #[test]
    fn every_type_selects_its_instantiation() {
        for ty in ElementType::ALL {
            let (name, device) = dispatch(Name, (ty, Device::Cpu)).unwrap();
            assert_eq!(name, ty.name());
            assert_eq!(device, Device::Cpu);
            assert_eq!(dispatch(HostOnly, (ty, Device::Cpu)), Ok(ty.element_size()));
        }
    }

    #[test]
    fn unknown_device() {
        assert_eq!(
            dispatch(Name, (ElementType::Float, Device::Unknown)),
            Err(Error::UnsupportedDevice(Device::Unknown))
        );
    }

    #[test]
    fn gpu_device() {
        assert_eq!(
            dispatch(HostOnly, (ElementType::Int8, Device::Gpu)),
            Err(Error::UnsupportedDevice(Device::Gpu))
        );
        #[cfg(feature = "gpu")]
        assert_eq!(
            dispatch(Name, (ElementType::Int8, Device::Gpu)),
            Ok(("int8", Device::Gpu))
        );
        #[cfg(not(feature = "gpu"))]
        assert_eq!(
            dispatch(Name, (ElementType::Int8, Device::Gpu)),
            Err(Error::UnsupportedDevice(Device::Gpu))
        );
    }

    #[test]
    fn explicit_tags() {
        let (name, _) = dispatch_with(
            ElementType::Int64,
            Device::Cpu,
            Name,
            (ElementType::Float, Device::Unknown),
        )
        .unwrap();
        assert_eq!(name, "int64");
    }
}
