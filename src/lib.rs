//! A small preemptive real-time kernel for single-core Cortex-M parts
//!
//! The kernel provides:
//! - Round-robin scheduling of a fixed pool of threads with a tick-based time slice
//! - Counting and binary semaphores with FIFO wait queues
//! - Tick-based sleeping and a sub-tick resolution time base
//! - Interrupt-context periodic and edge-triggered (button) task slots
//! - A bounded FIFO and a single-slot mailbox built on the semaphores

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod sync;
pub mod port;

#[cfg(target_arch = "arm")]
pub mod os;

// ============ Re-exports ============

pub use crate::core::config;
pub use crate::core::config::*;
pub use crate::core::critical;
pub use crate::core::error;
pub use crate::core::error::{os_trap, OsError, OsResult};
pub use crate::core::event;
pub use crate::core::event::EventSource;
pub use crate::core::kernel;
pub use crate::core::kernel::{ContextSwitch, Kernel};
pub use crate::core::periodic;
pub use crate::core::periodic::JitterStats;
pub use crate::core::types;
pub use crate::core::types::*;
pub use crate::core::task;
pub use crate::core::sched;
pub use crate::core::sched::Scheduler;
pub use crate::core::time;
pub use crate::core::time::time_difference;
#[cfg(feature = "stats")]
pub use crate::core::stats;
#[cfg(feature = "stats")]
pub use crate::core::stats::IntsDisabled;
#[cfg(feature = "stats")]
pub use crate::core::trace;
#[cfg(feature = "stats")]
pub use crate::core::trace::{TraceBuffer, TraceEvent, TraceRecord};

pub use port::{Port, TickPhase};

#[cfg(feature = "sem")]
pub use sync::sem;
#[cfg(feature = "sem")]
pub use sync::sem::{Pend, Semaphore};
#[cfg(feature = "fifo")]
pub use sync::fifo;
#[cfg(feature = "fifo")]
pub use sync::fifo::Fifo;
#[cfg(feature = "mailbox")]
pub use sync::mailbox;
#[cfg(feature = "mailbox")]
pub use sync::mailbox::Mailbox;
