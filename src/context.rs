//! Execution context shared by the kernels running on a thread.
//!
//! A [`Context`] lazily creates the random generator used by sampling kernels and, with the `gpu` feature, the
//! per-thread device state. Kernels receive the context by pairing it with their tensor argument, see
//! [`dispatch`](crate::dispatch::dispatch).

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::tensor::Device;
use crate::{Error, Result};

/// Settings applied when a [`Context`] creates its resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextConfig {
    /// Seed of the random generator. The generator is seeded from system entropy if `None`.
    pub seed: Option<u64>,
    /// Ordinal of the device opened for the device state.
    pub gpu_device: usize,
}

/// Per-thread resources of a device.
#[derive(Debug)]
pub struct DeviceState {
    #[cfg(feature = "gpu")]
    handle: xt_backend::gpu::DeviceHandle,
}
impl DeviceState {
    /// The ordinal of the opened device.
    pub fn ordinal(&self) -> usize {
        cfg_if::cfg_if! {
            if #[cfg(feature = "gpu")] {
                self.handle.ordinal()
            } else {
                0
            }
        }
    }
}

/// An execution context.
///
/// Resources are created on first use and owned by the context. The context is not shared between threads; each
/// thread creates its own.
#[derive(Debug, Default)]
pub struct Context {
    config: ContextConfig,
    generator: Option<StdRng>,
    device_state: Option<DeviceState>,
}
impl Context {
    /// Create a context with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context whose random generator is seeded with `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_config(ContextConfig {
            seed: Some(seed),
            ..Default::default()
        })
    }

    /// Create a context with the given configuration.
    pub fn from_config(config: ContextConfig) -> Self {
        Self {
            config,
            generator: None,
            device_state: None,
        }
    }

    /// The configuration of the context.
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// The random generator, created on first access.
    pub fn generator(&mut self) -> &mut StdRng {
        let seed = self.config.seed;
        self.generator.get_or_insert_with(|| {
            crate::log::debug!("Creating random generator, seed {seed:?}");
            match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            }
        })
    }

    /// Replace the random generator.
    pub fn set_generator(&mut self, generator: StdRng) {
        self.generator = Some(generator);
    }

    /// Whether device support is compiled in.
    pub fn has_gpu() -> bool {
        Device::Gpu.is_available()
    }

    /// The device state, created on first access.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnsupportedDevice`] if device support is not compiled in or the configured device does not
    /// exist.
    pub fn device_state(&mut self) -> Result<&mut DeviceState> {
        if self.device_state.is_none() {
            self.device_state = Some(self.open_device()?);
        }
        self.device_state
            .as_mut()
            .ok_or(Error::UnsupportedDevice(Device::Gpu))
    }

    fn open_device(&self) -> Result<DeviceState> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "gpu")] {
                let handle = xt_backend::gpu::DeviceHandle::open(self.config.gpu_device).map_err(|err| {
                    crate::log::error!("Failed to open device {}: {err}", self.config.gpu_device);
                    Error::from(err)
                })?;
                Ok(DeviceState { handle })
            } else {
                crate::log::error!("Device state requested but gpu support is not compiled in");
                Err(Error::UnsupportedDevice(Device::Gpu))
            }
        }
    }
}
