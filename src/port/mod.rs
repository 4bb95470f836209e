//! Port layer - CPU-specific implementations
//!
//! The kernel decides *when* to switch and *to what*; a [`Port`] does the
//! register save/restore, builds initial stack frames and reports the
//! tick timer phase.

#[cfg(target_arch = "arm")]
pub mod cortex_m4;

#[cfg(target_arch = "arm")]
pub use cortex_m4::CortexM4;

use crate::event::EventSource;
use crate::kernel::Kernel;
use crate::types::{OsPrio, OsStkElement, SlotId, ThreadFn, ThreadId};

/// Position inside the current tick period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickPhase {
    /// Time units elapsed since the last tick
    pub elapsed: u32,
    /// A tick has fired but its interrupt has not run yet
    pub pending: bool,
}

impl TickPhase {
    /// Sample a down-counting tick timer with interrupts masked
    ///
    /// The counter is read before the pending flag and again after it if
    /// the flag is set, so a wrap between the reads never pairs the old
    /// period's count with the new tick.
    pub fn sample<C, F>(reload: u32, mut current: C, pending: F) -> Self
    where
        C: FnMut() -> u32,
        F: FnOnce() -> bool,
    {
        let before = current();
        let pending = pending();
        let count = if pending { current() } else { before };
        TickPhase {
            elapsed: reload.wrapping_sub(count),
            pending,
        }
    }
}

/// Hosting platform of a [`Kernel`]
pub trait Port: Sync + Sized + 'static {
    /// Write the initial frame of a new thread into `stack`
    ///
    /// `stack` is the thread's stack region, bottom first, with the canary
    /// in word 0 which must not be overwritten. Returns the saved stack
    /// pointer as a word offset into `stack`; resuming it starts `entry`,
    /// and a return from `entry` kills the thread.
    fn init_stack(
        &self,
        kernel: &'static Kernel<Self>,
        stack: &mut [OsStkElement],
        entry: ThreadFn,
        id: ThreadId,
    ) -> usize;

    /// Write the initial frame of the idle context
    fn init_idle_stack(&self, stack: &mut [OsStkElement]) -> usize {
        stack.len()
    }

    /// Request a deferred context switch
    ///
    /// Called outside any critical section. The switch itself must call
    /// [`Kernel::switch_context`].
    fn pend_switch(&self, kernel: &Kernel<Self>);

    /// Start the tick source and dispatch the first context. Never returns.
    fn start_first(&self, kernel: &'static Kernel<Self>) -> !;

    /// Running in an interrupt handler
    fn in_isr(&self) -> bool;

    fn tick_phase(&self) -> TickPhase {
        TickPhase::default()
    }

    /// Start the hardware timer behind a periodic slot
    fn arm_periodic(&self, _slot: SlotId, _period: u32, _prio: OsPrio) {}

    /// Enable the edge interrupt behind an event source
    fn enable_event(&self, _source: EventSource, _prio: OsPrio) {}

    /// Idle until the next interrupt
    fn wait_for_interrupt(&self) {
        core::hint::spin_loop();
    }
}
