//! The closed set of element types a storage can hold.

use std::fmt::{Debug, Display};

use num_traits::AsPrimitive;

/// A trait for the Rust types that can be stored in a backend array.
///
/// The set is closed: `u8`, `i8`, `i16`, `i32`, `i64`, `f32` and `f64`. Each type carries a stable ordinal used to
/// index per-type tables, and the short name used in descriptors.
pub trait Element:
    Copy + Default + PartialEq + PartialOrd + Debug + Display + Send + Sync + 'static
{
    /// Position of the type in the closed set, in `0..ELEMENT_COUNT`.
    const ORDINAL: u8;
    /// Short name of the type, e.g. `"float"` for `f32`.
    const NAME: &'static str;

    /// Wrap the value into a [`Value`].
    fn into_value(self) -> Value;

    /// Convert any [`Value`] into this type, with the semantics of an `as` cast.
    fn from_value(value: Value) -> Self;

    private_decl! {}
}

/// Number of types in the closed element set.
pub const ELEMENT_COUNT: usize = 7;

/// A value of any element type.
///
/// Used as the pivot when converting between element types chosen at runtime.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[allow(missing_docs)]
pub enum Value {
    U8(u8),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}
impl Value {
    /// Convert the value to `T`, truncating or saturating the way `as` does.
    pub fn cast<T: Element>(self) -> T {
        T::from_value(self)
    }

    /// The ordinal of the element type of the wrapped value.
    pub fn ordinal(&self) -> u8 {
        match self {
            Value::U8(_) => u8::ORDINAL,
            Value::I8(_) => i8::ORDINAL,
            Value::I16(_) => i16::ORDINAL,
            Value::I32(_) => i32::ORDINAL,
            Value::I64(_) => i64::ORDINAL,
            Value::F32(_) => f32::ORDINAL,
            Value::F64(_) => f64::ORDINAL,
        }
    }
}
impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::U8(v) => Display::fmt(v, f),
            Value::I8(v) => Display::fmt(v, f),
            Value::I16(v) => Display::fmt(v, f),
            Value::I32(v) => Display::fmt(v, f),
            Value::I64(v) => Display::fmt(v, f),
            Value::F32(v) => Display::fmt(v, f),
            Value::F64(v) => Display::fmt(v, f),
        }
    }
}

macro_rules! impl_element {
    ($rust_type:ty, $variant:ident, $ordinal:expr, $name:expr) => {
        impl Element for $rust_type {
            const ORDINAL: u8 = $ordinal;
            const NAME: &'static str = $name;

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: Value) -> Self {
                match value {
                    Value::U8(v) => <u8 as AsPrimitive<$rust_type>>::as_(v),
                    Value::I8(v) => <i8 as AsPrimitive<$rust_type>>::as_(v),
                    Value::I16(v) => <i16 as AsPrimitive<$rust_type>>::as_(v),
                    Value::I32(v) => <i32 as AsPrimitive<$rust_type>>::as_(v),
                    Value::I64(v) => <i64 as AsPrimitive<$rust_type>>::as_(v),
                    Value::F32(v) => <f32 as AsPrimitive<$rust_type>>::as_(v),
                    Value::F64(v) => <f64 as AsPrimitive<$rust_type>>::as_(v),
                }
            }

            private_impl! {}
        }
        impl From<$rust_type> for Value {
            fn from(v: $rust_type) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_element!(u8, U8, 0, "uint8");
impl_element!(i8, I8, 1, "int8");
impl_element!(i16, I16, 2, "int16");
impl_element!(i32, I32, 3, "int32");
impl_element!(i64, I64, 4, "int64");
impl_element!(f32, F32, 5, "float");
impl_element!(f64, F64, 6, "double");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_dense() {
        let ordinals = [
            u8::ORDINAL,
            i8::ORDINAL,
            i16::ORDINAL,
            i32::ORDINAL,
            i64::ORDINAL,
            f32::ORDINAL,
            f64::ORDINAL,
        ];
        for (i, ordinal) in ordinals.into_iter().enumerate() {
            assert_eq!(ordinal as usize, i);
        }
        assert_eq!(ordinals.len(), ELEMENT_COUNT);
    }

    #[test]
    fn value_identity() {
        assert_eq!(Value::U8(u8::MAX).cast::<u8>(), u8::MAX);
        assert_eq!(Value::I8(i8::MIN).cast::<i8>(), i8::MIN);
        assert_eq!(Value::I16(i16::MIN).cast::<i16>(), i16::MIN);
        assert_eq!(Value::I32(i32::MAX).cast::<i32>(), i32::MAX);
        assert_eq!(Value::I64(i64::MIN).cast::<i64>(), i64::MIN);
        assert_eq!(Value::F32(f32::EPSILON).cast::<f32>(), f32::EPSILON);
        assert_eq!(Value::F64(-0.125).cast::<f64>(), -0.125);
    }

    #[test]
    fn value_conversion_follows_as_casts() {
        assert_eq!(Value::F64(3.9).cast::<i32>(), 3);
        assert_eq!(Value::F64(-1.0).cast::<u8>(), 0);
        assert_eq!(Value::F32(300.0).cast::<u8>(), 255);
        assert_eq!(Value::I32(300).cast::<u8>(), 44);
        assert_eq!(Value::I8(-1).cast::<u8>(), 255);
        assert_eq!(Value::U8(200).cast::<f64>(), 200.0);
        assert!(Value::F64(f64::NAN).cast::<f32>().is_nan());
    }

    #[test]
    fn value_ordinal_and_display() {
        assert_eq!(Value::from(1.5f32).ordinal(), f32::ORDINAL);
        assert_eq!(Value::from(7i16).ordinal(), i16::ORDINAL);
        assert_eq!(Value::from(-3i64).to_string(), "-3");
        assert_eq!(Value::from(2.5f64).to_string(), "2.5");
    }
}
