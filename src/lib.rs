#![cfg_attr(deny_warnings, deny(warnings))]
// some new clippy::lint annotations are supported in latest Rust but not recognized by older versions
#![cfg_attr(deny_warnings, allow(unknown_lints))]
#![cfg_attr(deny_warnings, deny(missing_docs))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! A runtime-typed tensor handle with shared storage and per-(type, device) kernel dispatch.
//!
//! The central type is [`Tensor`], a handle whose element type ([`ElementType`]) and device ([`Device`]) are chosen
//! at runtime. Generic code written against a concrete element type and backend is run on a tensor through the
//! [`dispatch`](dispatch::dispatch) multiplexer, which selects the instantiation matching the tags of the tensor from
//! a per-device table of function pointers.
//!
//! ```rust
//! use xt::{Device, ElementType, Tensor};
//!
//! let mut a = Tensor::with_shape(&[2, 3], ElementType::Float, Device::Cpu).unwrap();
//! a.data_mut::<f32>().unwrap()[4] = 2.5;
//!
//! // a shallow share aliases the storage
//! let b = a.clone();
//! assert!(b.shares_storage_with(&a));
//!
//! // a cast is an independent copy
//! let c = a.cast::<f64>().unwrap();
//! assert_eq!(c.to_values::<f64>().unwrap()[4], 2.5);
//! assert_eq!(c.sizes(), vec![2, 3]);
//!
//! let scalar = Tensor::scalar(7i64);
//! assert_eq!(scalar.dim(), 0);
//! assert_eq!(scalar.value::<f32>().unwrap(), 7.0);
//! ```
//!
//! Kernels that need per-thread resources, such as a random generator, receive an execution [`Context`] alongside
//! their tensor.
//!
//! ## Cargo Features
//! - `ndarray`:
//!     Conversions between `xt` tensors and `ndarray` arrays. Enabled by default.
//! - `gpu`:
//!     Enables the [`Device::Gpu`] backend, an emulated discrete device. Without it, every request for the device
//!     fails with [`Error::UnsupportedDevice`].
//!
//! ## Logging
//! The crate logs through the [`log`](::log) facade under the `xt` target: allocations and releases at trace level,
//! and rejected configurations at error level right before the error is returned.

#[macro_use]
mod private;

pub mod context;
pub mod dispatch;
pub mod error;
mod log;
pub mod tensor;

pub use context::{Context, ContextConfig, DeviceState};
pub use error::{Error, ErrorKind, Result};
pub use tensor::{Device, ElementType, Tensor};
pub use xt_backend::{Backend, Cpu, Element, HostArray, RawArray, Value};
#[cfg(feature = "gpu")]
pub use xt_backend::Gpu;

#[cfg(test)]
mod tests;
