use xt_backend::Element;

use crate::{Error, Result};

/// Element types a [`Tensor`](crate::Tensor) can hold.
///
/// The set is closed, and each variant has a stable ordinal in `0..ElementType::COUNT` used to index the
/// per-type kernel tables.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ElementType {
    /// 8-bit unsigned integer, `u8`
    UInt8 = 0,
    /// 8-bit signed integer, `i8`
    Int8 = 1,
    /// 16-bit signed integer, `i16`
    Int16 = 2,
    /// 32-bit signed integer, `i32`
    Int32 = 3,
    /// 64-bit signed integer, `i64`
    Int64 = 4,
    /// 32-bit floating point, `f32`
    Float = 5,
    /// 64-bit floating point, `f64`
    Double = 6,
}
impl ElementType {
    /// Number of element types.
    pub const COUNT: usize = xt_backend::ELEMENT_COUNT;

    /// All element types, in ordinal order.
    pub const ALL: [ElementType; Self::COUNT] = [
        ElementType::UInt8,
        ElementType::Int8,
        ElementType::Int16,
        ElementType::Int32,
        ElementType::Int64,
        ElementType::Float,
        ElementType::Double,
    ];

    const NAMES: [&'static str; Self::COUNT] = [
        u8::NAME,
        i8::NAME,
        i16::NAME,
        i32::NAME,
        i64::NAME,
        f32::NAME,
        f64::NAME,
    ];

    const SIZES: [usize; Self::COUNT] = [
        std::mem::size_of::<u8>(),
        std::mem::size_of::<i8>(),
        std::mem::size_of::<i16>(),
        std::mem::size_of::<i32>(),
        std::mem::size_of::<i64>(),
        std::mem::size_of::<f32>(),
        std::mem::size_of::<f64>(),
    ];

    /// The element type of the Rust type `T`.
    pub fn of<T: Element>() -> Self {
        Self::ALL[T::ORDINAL as usize]
    }

    /// The stable ordinal of the type.
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// The short name of the type, e.g. `"float"`.
    pub fn name(self) -> &'static str {
        Self::NAMES[self as usize]
    }

    /// Size of a single element in bytes.
    pub fn element_size(self) -> usize {
        Self::SIZES[self as usize]
    }
}
impl TryFrom<u8> for ElementType {
    type Error = Error;

    fn try_from(ordinal: u8) -> Result<Self> {
        Self::ALL.get(ordinal as usize).copied().ok_or_else(|| {
            crate::log::error!("Invalid element type ordinal {ordinal}");
            Error::InvalidElementType(ordinal)
        })
    }
}
impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check<T: Element>(expected: ElementType) {
        assert_eq!(ElementType::of::<T>(), expected);
        assert_eq!(expected.name(), T::NAME);
        assert_eq!(expected.element_size(), std::mem::size_of::<T>());
    }

    #[test]
    fn rust_types() {
        check::<u8>(ElementType::UInt8);
        check::<i8>(ElementType::Int8);
        check::<i16>(ElementType::Int16);
        check::<i32>(ElementType::Int32);
        check::<i64>(ElementType::Int64);
        check::<f32>(ElementType::Float);
        check::<f64>(ElementType::Double);
    }

    #[test]
    fn ordinals() {
        for (i, ty) in ElementType::ALL.into_iter().enumerate() {
            assert_eq!(ty.ordinal() as usize, i);
            assert_eq!(ElementType::try_from(i as u8), Ok(ty));
        }
        assert_eq!(
            ElementType::try_from(ElementType::COUNT as u8),
            Err(Error::InvalidElementType(ElementType::COUNT as u8))
        );
        assert_eq!(
            ElementType::try_from(u8::MAX),
            Err(Error::InvalidElementType(u8::MAX))
        );
    }

    #[test]
    fn names() {
        let names = ElementType::ALL.map(|ty| ty.to_string());
        assert_eq!(
            names,
            ["uint8", "int8", "int16", "int32", "int64", "float", "double"]
        );
    }
}
