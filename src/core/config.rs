//! Compile-time configuration
//!
//! These constants fix the kernel's resource limits and time base.

use crate::types::OsStkElement;

/// Number of thread slots in the TCB pool
pub const CFG_MAX_THREADS: usize = 20;

/// Stack region reserved for every pool slot, in words
pub const CFG_STK_SIZE: usize = 128;

/// Smallest stack a thread may ask for, in words
pub const CFG_STK_SIZE_MIN: usize = 32;

/// Stack of the idle context, in words
pub const CFG_IDLE_STK_SIZE: usize = 64;

/// Core clock in Hz (PLL at 80 MHz)
pub const CFG_CPU_CLOCK_HZ: u32 = 80_000_000;

/// System tick rate in Hz
pub const CFG_TICK_RATE_HZ: u32 = 1000;

/// Core clock cycles per tick; also the unit of `current_time`
pub const CFG_TICK_PERIOD: u32 = CFG_CPU_CLOCK_HZ / CFG_TICK_RATE_HZ;

/// Default time slice, in ticks
pub const CFG_TIME_SLICE_DEFAULT: u32 = 2;

/// Number of periodic (timer-driven) task slots
pub const CFG_PERIODIC_SLOTS: usize = 2;

/// Capacity of the kernel FIFO, must be a power of two
pub const CFG_FIFO_SIZE: usize = 128;

/// Number of buckets in a periodic task's jitter histogram
pub const CFG_JITTER_SIZE: usize = 64;

/// Time units per jitter bucket (8 cycles = 0.1 us at 80 MHz)
pub const CFG_JITTER_RESOLUTION: u32 = 8;

/// Capacity of the dispatch trace
pub const CFG_TRACE_SIZE: usize = 100;

/// Word written at the base of every thread stack
pub const CFG_STACK_CANARY: OsStkElement = 0xDEAD_BEEF;
