//! Core type definitions
//!
//! These types give the kernel primitives distinct names.

/// Thread priority (0 = highest). Informational only: the run-list is
/// strict round-robin.
pub type OsPrio = u8;

/// Tick counter type
pub type OsTick = u32;

/// Time in core clock cycles, as returned by `current_time`
pub type OsTime = u32;

/// Semaphore counter type
pub type OsSemCtr = i32;

/// Stack element type
pub type OsStkElement = u32;

/// Index of a periodic task slot
pub type SlotId = usize;

/// Foreground thread entry point. Returning from it kills the thread.
pub type ThreadFn = fn();

/// Background task: runs to completion in interrupt context, never blocks.
pub type TaskFn = fn();

/// Thread identifier, assigned in increasing order and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ThreadId(pub u32);

impl ThreadId {
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Thread state
///
/// The running thread is `Ready`: it stays in the run-list while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ThreadState {
    /// Slot is free (never used, or its thread was killed)
    Dead = 0,
    /// In the run-list
    Ready = 1,
    /// Counting down `sleep_ticks`, off the run-list
    Sleeping = 2,
    /// Queued on a semaphore, off the run-list
    Blocked = 3,
}
