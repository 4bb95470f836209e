//! Kernel logging macros
//!
//! With the `defmt` feature the macros forward to `defmt` (RTT transport,
//! tick-count timestamps). Without it they only type-check their
//! arguments; nothing is evaluated in a silent build.

/// Trace message (per-switch / per-tick detail)
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { defmt::trace!($($arg)*) };
}

/// Debug message
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { defmt::debug!($($arg)*) };
}

/// Info message (lifecycle events: init, launch, thread add/kill)
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { defmt::info!($($arg)*) };
}

/// Warning message (rejected registrations, capacity limits)
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { defmt::warn!($($arg)*) };
}

/// Error message (fatal traps)
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { defmt::error!($($arg)*) };
}

#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! trace { ($($arg:tt)*) => {{ if false { let _ = ($($arg)*); } }}; }
#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! debug { ($($arg:tt)*) => {{ if false { let _ = ($($arg)*); } }}; }
#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! info { ($($arg:tt)*) => {{ if false { let _ = ($($arg)*); } }}; }
#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! warn { ($($arg:tt)*) => {{ if false { let _ = ($($arg)*); } }}; }
#[cfg(not(feature = "defmt"))]
#[macro_export]
macro_rules! error { ($($arg:tt)*) => {{ if false { let _ = ($($arg)*); } }}; }
