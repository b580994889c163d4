//! Error types used in the [`xt`](crate) crate.

use xt_backend::BackendError;

use crate::tensor::{Device, ElementType};

/// The category of an [`Error`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ErrorKind {
    /// An unsupported device, an invalid tag or an invalid layout was requested.
    Configuration,
    /// A dimension or element index is out of range.
    Bounds,
    /// The handle is not in the state the operation requires.
    State,
    /// A typed view was requested with a type or device that does not match the handle.
    TypeMismatch,
}

/// xt error type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub enum Error {
    /* Configuration errors */
    //
    /// The device is not available in this build, or the handle has no device.
    UnsupportedDevice(Device),
    /// An element type ordinal outside the closed set.
    InvalidElementType(u8),
    /// The sizes and strides sequences have different lengths.
    ShapeStrideMismatch {
        /// Number of sizes.
        sizes: usize,
        /// Number of strides.
        strides: usize,
    },
    /// A size entry is zero or negative.
    NonPositiveSize {
        /// The offending dimension.
        dim: usize,
        /// Its size.
        size: i64,
    },
    /// A stride entry is negative.
    NegativeStride {
        /// The offending dimension.
        dim: usize,
        /// Its stride.
        stride: i64,
    },
    /// The layout addresses more elements than can be allocated.
    SizeOverflow,
    /// The allocator could not provide the storage of a layout.
    AllocationFailed {
        /// Size of the requested storage.
        bytes: usize,
    },

    /* Bounds errors */
    //
    /// A dimension index outside `0..dim()`.
    DimOutOfRange {
        /// The requested dimension.
        dim: i64,
        /// Rank of the tensor.
        rank: i64,
    },
    /// An element index outside the dimension it indexes.
    IndexOutOfRange {
        /// The requested index.
        index: i64,
        /// Length of the indexed dimension.
        len: i64,
    },
    /// The tensor rank differs from the rank an operation requires.
    RankMismatch {
        /// The required rank.
        expected: i64,
        /// Rank of the tensor.
        actual: i64,
    },

    /* State errors */
    //
    /// A scalar read on a handle that does not hold a scalar.
    NotAScalar,
    /// Conversion to a scalar of a tensor that is not one-dimensional with a single element.
    NotConvertibleToScalar,
    /// An element-wise copy between tensors of different element counts.
    NumelMismatch {
        /// Element count of the destination.
        dst: usize,
        /// Element count of the source.
        src: usize,
    },
    /// The storage is already borrowed in a conflicting way.
    StorageBorrowed,

    /* Type errors */
    //
    /// A typed view requested with an element type other than the handle's.
    TypeMismatch {
        /// The element type of the handle.
        expected: ElementType,
        /// The requested element type.
        actual: ElementType,
    },
    /// A typed view requested on a device other than the handle's.
    DeviceMismatch {
        /// The device of the handle.
        expected: Device,
        /// The requested device.
        actual: Device,
    },
}
impl Error {
    /// The category of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedDevice(_)
            | Error::InvalidElementType(_)
            | Error::ShapeStrideMismatch { .. }
            | Error::NonPositiveSize { .. }
            | Error::NegativeStride { .. }
            | Error::SizeOverflow
            | Error::AllocationFailed { .. } => ErrorKind::Configuration,
            Error::DimOutOfRange { .. }
            | Error::IndexOutOfRange { .. }
            | Error::RankMismatch { .. } => ErrorKind::Bounds,
            Error::NotAScalar
            | Error::NotConvertibleToScalar
            | Error::NumelMismatch { .. }
            | Error::StorageBorrowed => ErrorKind::State,
            Error::TypeMismatch { .. } | Error::DeviceMismatch { .. } => ErrorKind::TypeMismatch,
        }
    }
}
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::UnsupportedDevice(device) => write!(f, "unsupported device: {device}"),
            Error::InvalidElementType(ordinal) => write!(f, "invalid element type ordinal {ordinal}"),
            Error::ShapeStrideMismatch { sizes, strides } => {
                write!(f, "{sizes} sizes but {strides} strides")
            }
            Error::NonPositiveSize { dim, size } => {
                write!(f, "size {size} of dim {dim} is not positive")
            }
            Error::NegativeStride { dim, stride } => {
                write!(f, "stride {stride} of dim {dim} is negative")
            }
            Error::SizeOverflow => write!(f, "layout size overflows"),
            Error::AllocationFailed { bytes } => {
                write!(f, "failed to allocate {bytes} bytes of storage")
            }
            Error::DimOutOfRange { dim, rank } => {
                write!(f, "dim {dim} out of range for a tensor of rank {rank}")
            }
            Error::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            Error::RankMismatch { expected, actual } => {
                write!(f, "expected a tensor of rank {expected}, got rank {actual}")
            }
            Error::NotAScalar => write!(f, "tensor is not a scalar"),
            Error::NotConvertibleToScalar => {
                write!(f, "only a one-dimensional tensor of one element converts to a scalar")
            }
            Error::NumelMismatch { dst, src } => {
                write!(f, "cannot copy {src} elements into {dst} elements")
            }
            Error::StorageBorrowed => write!(f, "tensor storage is already borrowed"),
            Error::TypeMismatch { expected, actual } => {
                write!(f, "tensor holds {expected} elements, not {actual}")
            }
            Error::DeviceMismatch { expected, actual } => {
                write!(f, "tensor lives on {expected}, not {actual}")
            }
        }
    }
}
impl std::error::Error for Error {}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::ShapeStrideMismatch { sizes, strides } => {
                Error::ShapeStrideMismatch { sizes, strides }
            }
            BackendError::NegativeSize { dim, size } => Error::NonPositiveSize { dim, size },
            BackendError::NegativeStride { dim, stride } => Error::NegativeStride { dim, stride },
            BackendError::NotOneDimensional { rank } => Error::RankMismatch {
                expected: 1,
                actual: rank as i64,
            },
            BackendError::IndexOutOfRange { index, len } => Error::IndexOutOfRange { index, len },
            BackendError::NumelMismatch { dst, src } => Error::NumelMismatch { dst, src },
            BackendError::NoSuchDevice(_) => Error::UnsupportedDevice(Device::Gpu),
            BackendError::AllocationFailed { bytes } => Error::AllocationFailed { bytes },
            _ => Error::SizeOverflow,
        }
    }
}

/// Result type for xt operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }

    #[test]
    fn error_kinds() {
        assert_eq!(
            Error::UnsupportedDevice(Device::Unknown).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            Error::DimOutOfRange { dim: 0, rank: 0 }.kind(),
            ErrorKind::Bounds
        );
        assert_eq!(Error::NotAScalar.kind(), ErrorKind::State);
        assert_eq!(
            Error::TypeMismatch {
                expected: ElementType::Float,
                actual: ElementType::Double
            }
            .kind(),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn backend_errors_map_to_kinds() {
        let err = Error::from(BackendError::NegativeStride { dim: 1, stride: -2 });
        assert_eq!(err, Error::NegativeStride { dim: 1, stride: -2 });
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = Error::from(BackendError::IndexOutOfRange { index: 5, len: 3 });
        assert_eq!(err.kind(), ErrorKind::Bounds);

        let err = Error::from(BackendError::NumelMismatch { dst: 2, src: 3 });
        assert_eq!(err.kind(), ErrorKind::State);

        assert_eq!(Error::from(BackendError::SizeOverflow), Error::SizeOverflow);
        let err = Error::from(BackendError::AllocationFailed { bytes: 64 });
        assert_eq!(err, Error::AllocationFailed { bytes: 64 });
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            Error::UnsupportedDevice(Device::Gpu).to_string(),
            "unsupported device: gpu"
        );
        assert_eq!(
            Error::TypeMismatch {
                expected: ElementType::Float,
                actual: ElementType::Int32
            }
            .to_string(),
            "tensor holds float elements, not int32"
        );
    }
}
