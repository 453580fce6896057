//! Logging macros
//!
//! On the watch everything goes out over RTT through `defmt`, on a desktop host through
//! the `log` facade. Without either feature the macros expand to nothing.

#![allow(unused_imports, unused_macros)]

cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        pub(crate) use defmt::{debug, error, info, warn};
    } else if #[cfg(feature = "log")] {
        pub(crate) use log::{debug, error, info, warn};
    } else {
        macro_rules! debug {
            ($($arg:tt)*) => {{}};
        }
        macro_rules! info {
            ($($arg:tt)*) => {{}};
        }
        macro_rules! warn {
            ($($arg:tt)*) => {{}};
        }
        macro_rules! error {
            ($($arg:tt)*) => {{}};
        }
        pub(crate) use debug;
        pub(crate) use error;
        pub(crate) use info;
        pub(crate) use warn;
    }
}
