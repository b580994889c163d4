use xt_backend::{Backend, DeviceKind};

/// The device a [`Tensor`](crate::Tensor) stores its elements on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Device {
    /// No device, the tag of a tensor without storage.
    #[default]
    Unknown,
    /// Host memory.
    Cpu,
    /// Discrete device memory, available with the `gpu` feature.
    Gpu,
}
impl Device {
    /// Whether tensors can be allocated on the device in this build.
    pub fn is_available(self) -> bool {
        match self {
            Device::Unknown => false,
            Device::Cpu => true,
            Device::Gpu => cfg!(feature = "gpu"),
        }
    }

    /// The device of the backend `B`.
    pub fn of<B: Backend>() -> Self {
        B::KIND.into()
    }

    /// The short name of the device, e.g. `"cpu"`.
    pub fn name(self) -> &'static str {
        match self {
            Device::Unknown => "unknown",
            Device::Cpu => "cpu",
            Device::Gpu => "gpu",
        }
    }
}
impl From<DeviceKind> for Device {
    fn from(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Cpu => Device::Cpu,
            DeviceKind::Gpu => Device::Gpu,
        }
    }
}
impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
