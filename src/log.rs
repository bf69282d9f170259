//! Conditional logging macros.
//!
//! With the `tracing` feature, `crate::log::{debug, info, warn}` are the
//! `tracing` macros. Without it they swallow their arguments, so call sites
//! may freely use structured `field = value` syntax either way.

#[cfg(feature = "tracing")]
pub use tracing::{debug, info, warn};

#[cfg(not(feature = "tracing"))]
#[macro_export]
#[doc(hidden)]
macro_rules! __fieldmark_debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
#[doc(hidden)]
macro_rules! __fieldmark_info {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
#[doc(hidden)]
macro_rules! __fieldmark_warn {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub use crate::{
    __fieldmark_debug as debug, __fieldmark_info as info, __fieldmark_warn as warn,
};
