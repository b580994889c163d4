//! Logging macros used inside the crate, forwarding to the [`log`](::log) facade under the `xt` target.

macro_rules! error {
    ($($arg:tt)*) => {{
        ::log::error!(target: "xt", $($arg)*);
    }}
}
macro_rules! debug {
    ($($arg:tt)*) => {{
        ::log::debug!(target: "xt", $($arg)*);
    }}
}
macro_rules! trace {
    ($($arg:tt)*) => {{
        ::log::trace!(target: "xt", $($arg)*);
    }}
}
pub(crate) use debug;
pub(crate) use error;
pub(crate) use trace;
