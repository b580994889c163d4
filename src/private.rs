//! Sealing helpers for traits that must not be implemented outside this crate.

/// Unnameable marker returned by the sealing method.
pub struct PrivateMarker;

macro_rules! private_decl {
    () => {
        /// This method exists only to seal the trait; it can not be implemented outside the crate.
        #[doc(hidden)]
        fn __private__(&self) -> crate::private::PrivateMarker;
    };
}

macro_rules! private_impl {
    () => {
        fn __private__(&self) -> crate::private::PrivateMarker {
            crate::private::PrivateMarker
        }
    };
}
