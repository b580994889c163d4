//! Errors reported by backend storage primitives.

/// Backend error type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub enum BackendError {
    /// The sizes and strides sequences have different lengths.
    ShapeStrideMismatch {
        /// Number of sizes.
        sizes: usize,
        /// Number of strides.
        strides: usize,
    },
    /// A size entry is negative.
    NegativeSize {
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
    /// The layout addresses more elements than can be represented.
    SizeOverflow,
    /// The allocator could not provide the storage of a layout.
    AllocationFailed {
        /// Size of the requested storage.
        bytes: usize,
    },
    /// A one-dimensional access on an array of another rank.
    NotOneDimensional {
        /// The actual rank of the array.
        rank: usize,
    },
    /// An element index outside `0..len`.
    IndexOutOfRange {
        /// The requested index.
        index: i64,
        /// Length of the indexed dimension.
        len: i64,
    },
    /// A copy between arrays with different element counts.
    NumelMismatch {
        /// Element count of the destination.
        dst: usize,
        /// Element count of the source.
        src: usize,
    },
    /// The requested device ordinal does not exist.
    NoSuchDevice(usize),
}
impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            BackendError::ShapeStrideMismatch { sizes, strides } => {
                write!(f, "{sizes} sizes but {strides} strides")
            }
            BackendError::NegativeSize { dim, size } => write!(f, "negative size {size} at dim {dim}"),
            BackendError::NegativeStride { dim, stride } => {
                write!(f, "negative stride {stride} at dim {dim}")
            }
            BackendError::SizeOverflow => write!(f, "layout size overflows"),
            BackendError::AllocationFailed { bytes } => {
                write!(f, "failed to allocate {bytes} bytes of storage")
            }
            BackendError::NotOneDimensional { rank } => {
                write!(f, "expected a one-dimensional array, got rank {rank}")
            }
            BackendError::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            BackendError::NumelMismatch { dst, src } => {
                write!(f, "cannot copy {src} elements into {dst} elements")
            }
            BackendError::NoSuchDevice(ordinal) => write!(f, "no device with ordinal {ordinal}"),
        }
    }
}
impl std::error::Error for BackendError {}
