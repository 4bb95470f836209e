//! Semaphore implementation
//!
//! Counting and binary semaphores with an explicit FIFO wait queue. A
//! signal that finds a waiter hands the unit straight to it and leaves
//! `value` alone, so a woken thread never has to re-check the count.
//!
//! `value >= 0` is the number of units available (0 or 1 for a binary
//! semaphore); it never goes negative through these operations.

use crate::core::cs_cell::CsCell;
use crate::critical::{critical_section, CriticalSection};
use crate::error::{OsError, OsResult};
use crate::kernel::Kernel;
use crate::port::Port;
use crate::sched::Scheduler;
use crate::task::Tcb;
use crate::types::OsSemCtr;

/// Wait queue of blocked threads, linked through `Tcb::block_next`
#[derive(Debug, Clone, Copy)]
pub struct WaitQueue {
    head: Option<usize>,
    tail: Option<usize>,
}

impl WaitQueue {
    /// Create a new empty wait queue
    pub const fn new() -> Self {
        WaitQueue { head: None, tail: None }
    }

    /// Check if queue is empty
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Get head of queue
    #[inline(always)]
    pub fn head(&self) -> Option<usize> {
        self.head
    }

    /// Append a TCB at the tail
    pub fn push_back(&mut self, tcbs: &mut [Tcb], idx: usize) {
        tcbs[idx].block_next = None;

        match self.tail {
            Some(tail) => tcbs[tail].block_next = Some(idx),
            None => self.head = Some(idx),
        }

        self.tail = Some(idx);
    }

    /// Remove and return the head TCB
    pub fn pop_front(&mut self, tcbs: &mut [Tcb]) -> Option<usize> {
        let idx = self.head?;

        self.head = tcbs[idx].block_next.take();
        if self.head.is_none() {
            self.tail = None;
        }

        Some(idx)
    }

    /// Number of waiting threads
    pub fn len(&self, tcbs: &[Tcb]) -> usize {
        let mut count = 0;
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            count += 1;
            cursor = tcbs[idx].block_next;
        }
        count
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of an acquire attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pend {
    /// A unit was taken, the caller keeps running
    Acquired,
    /// The caller was queued; it owns a unit once it runs again
    Blocked,
}

struct SemState {
    value: OsSemCtr,
    waiters: WaitQueue,
}

/// Semaphore object
pub struct Semaphore {
    state: CsCell<SemState>,
}

impl Semaphore {
    pub const fn new(value: OsSemCtr) -> Self {
        Semaphore {
            state: CsCell::new(SemState {
                value,
                waiters: WaitQueue::new(),
            }),
        }
    }

    /// Set the count and clear the wait queue
    ///
    /// Must not be called while threads are queued on the semaphore.
    pub fn init(&self, value: OsSemCtr) {
        critical_section(|cs| {
            let state = self.state.get(cs);
            debug_assert!(state.waiters.is_empty(), "semaphore re-initialized with waiters");
            state.value = value;
            state.waiters = WaitQueue::new();
        });
    }

    /// Current count
    pub fn value(&self) -> OsSemCtr {
        critical_section(|cs| self.state.get(cs).value)
    }

    /// No thread is queued
    pub fn has_no_waiters(&self) -> bool {
        critical_section(|cs| self.state.get(cs).waiters.is_empty())
    }

    // ============ Operations on the scheduler ============

    /// Counting wait: take a unit or block the running thread
    pub fn acquire(&self, cs: &CriticalSection, sched: &mut Scheduler) -> OsResult<Pend> {
        let state = self.state.get(cs);
        if state.value > 0 {
            state.value -= 1;
            return Ok(Pend::Acquired);
        }

        let idx = sched.block_current()?;
        state.waiters.push_back(sched.tcbs_mut(), idx);
        Ok(Pend::Blocked)
    }

    /// Counting signal: wake the first waiter, or add a unit
    pub fn release(&self, cs: &CriticalSection, sched: &mut Scheduler) {
        let state = self.state.get(cs);
        match state.waiters.pop_front(sched.tcbs_mut()) {
            Some(idx) => sched.unblock(idx),
            None => state.value = state.value.saturating_add(1),
        }
    }

    /// Binary wait: take the flag or block the running thread
    pub fn acquire_binary(&self, cs: &CriticalSection, sched: &mut Scheduler) -> OsResult<Pend> {
        let state = self.state.get(cs);
        if state.value > 0 {
            state.value = 0;
            return Ok(Pend::Acquired);
        }

        let idx = sched.block_current()?;
        state.waiters.push_back(sched.tcbs_mut(), idx);
        Ok(Pend::Blocked)
    }

    /// Binary signal: wake the first waiter, or set the flag
    pub fn release_binary(&self, cs: &CriticalSection, sched: &mut Scheduler) {
        let state = self.state.get(cs);
        match state.waiters.pop_front(sched.tcbs_mut()) {
            Some(idx) => sched.unblock(idx),
            None => state.value = 1,
        }
    }

    /// Take a unit if one is available, never blocks
    pub fn try_acquire(&self, cs: &CriticalSection) -> bool {
        let state = self.state.get(cs);
        if state.value > 0 {
            state.value -= 1;
            true
        } else {
            false
        }
    }

    /// Number of queued threads
    pub fn waiters(&self, cs: &CriticalSection, sched: &Scheduler) -> usize {
        self.state.get(cs).waiters.len(sched.tcbs())
    }
}

// ============ Kernel API ============

impl<P: Port> Kernel<P> {
    /// Wait on a counting semaphore. Blocks while no unit is available.
    pub fn wait(&self, sem: &Semaphore) -> OsResult<()> {
        if self.port().in_isr() {
            return Err(OsError::PendIsr);
        }
        self.with_sched(|cs, sched| sem.acquire(cs, sched)).map(|_| ())
    }

    /// Signal a counting semaphore. Safe from interrupt handlers.
    pub fn signal(&self, sem: &Semaphore) {
        self.with_sched(|cs, sched| sem.release(cs, sched));
    }

    /// Wait on a binary semaphore
    pub fn bwait(&self, sem: &Semaphore) -> OsResult<()> {
        if self.port().in_isr() {
            return Err(OsError::PendIsr);
        }
        self.with_sched(|cs, sched| sem.acquire_binary(cs, sched)).map(|_| ())
    }

    /// Signal a binary semaphore. Safe from interrupt handlers.
    pub fn bsignal(&self, sem: &Semaphore) {
        self.with_sched(|cs, sched| sem.release_binary(cs, sched));
    }
}
