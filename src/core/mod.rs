//! Core kernel modules
//!
//! Contains the kernel object, thread pool, scheduler, time base and the
//! interrupt-context task dispatchers, plus the optional statistics.

pub mod config;
pub mod critical;
pub mod error;
pub mod event;
pub mod kernel;
pub mod periodic;
pub mod types;
pub mod task;
pub mod sched;
pub mod time;
pub mod cs_cell;
#[cfg(feature = "stats")]
pub mod stats;
#[cfg(feature = "stats")]
pub mod trace;
