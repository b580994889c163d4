//! Storage primitives behind the `xt` tensor handle.
//!
//! Every backend provides, for each [`Element`] type, a strided array implementing [`RawArray`]. The arrays are
//! plain values; sharing, type erasure and runtime dispatch over `(element type, device)` pairs are the business of
//! the `xt` crate.
//!
//! Two backends exist: [`Cpu`], storing elements in host memory, and, with the `gpu` feature, [`Gpu`], an emulated
//! discrete device.
//!
//! ```rust
//! use xt_backend::{HostArray, RawArray};
//!
//! let mut array = HostArray::<f32>::default();
//! array.resize(&[2, 3], &[3, 1]).unwrap();
//! array.write_logical([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! assert_eq!(array.numel(), 6);
//! assert_eq!(array.read_logical()[4], 5.0);
//! ```

#![cfg_attr(deny_warnings, deny(warnings))]
#![cfg_attr(deny_warnings, deny(missing_docs))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

#[macro_use]
mod private;

mod array;
pub mod cpu;
mod element;
mod error;
#[cfg(feature = "gpu")]
pub mod gpu;

pub use array::{contiguous_strides, copy, HostArray, LogicalOffsets, RawArray};
pub use cpu::Cpu;
pub use element::{Element, Value, ELEMENT_COUNT};
pub use error::BackendError;
#[cfg(feature = "gpu")]
pub use gpu::Gpu;

/// The kind of device a backend stores its elements on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Host memory.
    Cpu,
    /// Discrete device memory.
    Gpu,
}

/// A storage backend: one strided array type per element type.
pub trait Backend: 'static {
    /// The device the arrays live on.
    const KIND: DeviceKind;

    /// The array type holding elements of type `T`.
    type Array<T: Element>: RawArray<T>;
}
