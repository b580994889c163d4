//! Host memory backend.

use crate::{Backend, DeviceKind, Element, HostArray};

/// The host backend, storing elements in a [`HostArray`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Cpu;
impl Backend for Cpu {
    const KIND: DeviceKind = DeviceKind::Cpu;
    type Array<T: Element> = HostArray<T>;
}
