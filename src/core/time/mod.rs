//! Time base
//!
//! A 32-bit tick counter advanced once per tick interrupt. Sub-tick
//! resolution comes from the port's tick timer phase, see
//! [`Kernel::current_time`](crate::kernel::Kernel::current_time).

use portable_atomic::{AtomicU32, Ordering};

use crate::types::{OsTick, OsTime};

/// Monotonic tick counter, wraps at 2^32
pub struct SystemClock {
    ticks: AtomicU32,
}

impl SystemClock {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
        }
    }

    /// Get current tick count
    #[inline(always)]
    pub fn ticks(&self) -> OsTick {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Increment and return tick count
    #[inline(always)]
    pub(crate) fn tick(&self) -> OsTick {
        self.ticks.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    #[inline(always)]
    pub(crate) fn reset(&self) {
        self.ticks.store(0, Ordering::Relaxed);
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Elapsed time from `start` to `end`
///
/// Plain wrapping subtraction: a pair of readings taken across the 32-bit
/// wrap still yields the small forward distance.
#[inline]
pub fn time_difference(start: OsTime, end: OsTime) -> OsTime {
    end.wrapping_sub(start)
}
