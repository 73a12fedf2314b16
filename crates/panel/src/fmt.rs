//! Logging shim.
//!
//! Forwards to `defmt` on target builds and to `tracing` on host builds.
//! With neither feature enabled the arguments are still borrowed so that
//! values computed only for logging do not trigger unused warnings.
//!
//! Format strings must stay within the common subset of both backends:
//! `{}` for integers and string slices, `{:?}` for enums.

#![allow(unused_macros)]

macro_rules! log_at {
    ($defmt:ident, $tracing:ident, $s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::$defmt!($s $(, $x)*);
        #[cfg(feature = "tracing")]
        ::tracing::$tracing!($s $(, $x)*);
        #[cfg(not(any(feature = "defmt", feature = "tracing")))]
        let _ = ($( & $x ),*);
    }};
}

macro_rules! trace {
    ($($arg:tt)*) => { log_at!(trace, trace, $($arg)*) };
}

macro_rules! debug {
    ($($arg:tt)*) => { log_at!(debug, debug, $($arg)*) };
}

macro_rules! info {
    ($($arg:tt)*) => { log_at!(info, info, $($arg)*) };
}

macro_rules! warn {
    ($($arg:tt)*) => { log_at!(warn, warn, $($arg)*) };
}

macro_rules! error {
    ($($arg:tt)*) => { log_at!(error, error, $($arg)*) };
}
