//! Thread Control Block (TCB) definition
//!
//! A TCB lives in a fixed pool slot. Links are pool indices, not pointers.

use crate::types::{OsPrio, OsTick, ThreadFn, ThreadId, ThreadState};

/// Thread Control Block
#[derive(Debug, Clone, Copy)]
pub struct Tcb {
    // ============ Stack ============
    /// Saved stack pointer, as a word offset into the slot's stack region.
    /// Meaningless while the thread is running.
    pub stk_ptr: usize,
    /// Word offset of the lowest word in use; holds the canary
    pub stk_base: usize,

    // ============ Run-list links ============
    /// Next TCB in the circular run-list
    pub next: Option<usize>,
    /// Previous TCB in the circular run-list
    pub prev: Option<usize>,

    // ============ Wait queue link ============
    /// Next TCB on the same semaphore's wait queue
    pub block_next: Option<usize>,

    // ============ Identity ============
    pub id: ThreadId,
    pub prio: OsPrio,
    pub entry: Option<ThreadFn>,

    // ============ State ============
    pub state: ThreadState,
    /// Remaining sleep, in ticks; zero means runnable
    pub sleep_ticks: OsTick,
}

impl Tcb {
    pub const fn new() -> Self {
        Tcb {
            stk_ptr: 0,
            stk_base: 0,
            next: None,
            prev: None,
            block_next: None,
            id: ThreadId(0),
            prio: 0,
            entry: None,
            state: ThreadState::Dead,
            sleep_ticks: 0,
        }
    }

    /// Slot holds a live thread
    #[inline]
    pub fn is_active(&self) -> bool {
        self.state != ThreadState::Dead
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == ThreadState::Ready
    }

    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.state == ThreadState::Blocked
    }

    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.state == ThreadState::Sleeping
    }

    /// Linked into the run-list
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.next.is_some()
    }
}

impl Default for Tcb {
    fn default() -> Self {
        Self::new()
    }
}
