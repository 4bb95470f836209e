//! Scheduler module
//!
//! Strict round-robin over the run-list with a tick-counted time slice.
//!
//! The scheduler never switches stacks itself. Operations that take the
//! running thread off the CPU raise a switch request; the port services
//! it later from the lowest-priority exception, which calls
//! [`Scheduler::switch_context`] to save the outgoing context and pick
//! the next one.

mod run_list;

pub use run_list::{RunList, RunListIter};

use crate::config::{CFG_IDLE_STK_SIZE, CFG_TIME_SLICE_DEFAULT};
use crate::error::{OsError, OsResult};
use crate::task::{self, Tcb, TcbPool};
use crate::types::{OsPrio, OsStkElement, OsTick, ThreadFn, ThreadId, ThreadState};

/// Scheduler state: thread pool, run-list and the running context
///
/// `current == None` after launch means the idle context owns the CPU.
pub struct Scheduler {
    pool: TcbPool,
    run_list: RunList,
    current: Option<usize>,
    /// The running thread was killed; its slot must not be saved into
    current_exited: bool,
    /// Run-list successor of a running thread that unlinked itself
    successor: Option<usize>,
    launched: bool,
    switch_requested: bool,
    time_slice: OsTick,
    slice_left: OsTick,
    next_id: u32,
    idle_stack: [OsStkElement; CFG_IDLE_STK_SIZE],
    idle_sp: usize,
}

impl Scheduler {
    pub const fn new() -> Self {
        Scheduler {
            pool: TcbPool::new(),
            run_list: RunList::new(),
            current: None,
            current_exited: false,
            successor: None,
            launched: false,
            switch_requested: false,
            time_slice: CFG_TIME_SLICE_DEFAULT,
            slice_left: CFG_TIME_SLICE_DEFAULT,
            next_id: 0,
            idle_stack: [0; CFG_IDLE_STK_SIZE],
            idle_sp: CFG_IDLE_STK_SIZE,
        }
    }

    pub fn reset(&mut self) {
        self.pool.reset();
        self.run_list.init();
        self.current = None;
        self.current_exited = false;
        self.successor = None;
        self.launched = false;
        self.switch_requested = false;
        self.time_slice = CFG_TIME_SLICE_DEFAULT;
        self.slice_left = CFG_TIME_SLICE_DEFAULT;
        self.next_id = 0;
        self.idle_sp = CFG_IDLE_STK_SIZE;
    }

    // ============ Queries ============

    #[inline]
    pub fn pool(&self) -> &TcbPool {
        &self.pool
    }

    #[inline]
    pub fn run_list(&self) -> &RunList {
        &self.run_list
    }

    #[inline]
    pub fn tcbs(&self) -> &[Tcb] {
        self.pool.tcbs()
    }

    /// Slot of the running thread, `None` while idle or before launch
    #[inline]
    pub fn current(&self) -> Option<usize> {
        if self.current_exited {
            None
        } else {
            self.current
        }
    }

    pub fn current_id(&self) -> Option<ThreadId> {
        self.current().map(|idx| self.pool.tcb(idx).id)
    }

    #[inline]
    pub fn is_launched(&self) -> bool {
        self.launched
    }

    /// Live threads: ready, sleeping or blocked
    #[inline]
    pub fn thread_count(&self) -> usize {
        self.pool.live()
    }

    pub fn thread_state(&self, id: ThreadId) -> Option<ThreadState> {
        self.pool.find(id).map(|idx| self.pool.tcb(idx).state)
    }

    #[inline]
    pub fn time_slice(&self) -> OsTick {
        self.time_slice
    }

    /// Thread ids in dispatch order, starting at the run-list head
    pub fn run_order(&self) -> impl Iterator<Item = ThreadId> + '_ {
        let tcbs = self.pool.tcbs();
        self.run_list.iter(tcbs).map(move |idx| tcbs[idx].id)
    }

    // ============ Switch requests ============

    /// Ask for a context switch. Idempotent.
    #[inline]
    pub fn request_switch(&mut self) {
        self.switch_requested = true;
    }

    #[inline]
    pub fn switch_requested(&self) -> bool {
        self.switch_requested
    }

    /// Read and clear the switch request
    #[inline]
    pub fn take_switch_request(&mut self) -> bool {
        core::mem::replace(&mut self.switch_requested, false)
    }

    // ============ Thread lifecycle ============

    /// Build the idle context on its private stack
    ///
    /// `init` writes the initial frame and returns the saved stack pointer
    /// as a word offset into the stack it is given.
    pub fn init_idle<F>(&mut self, init: F)
    where
        F: FnOnce(&mut [OsStkElement]) -> usize,
    {
        self.idle_sp = init(&mut self.idle_stack);
    }

    /// Add a thread at the tail of the run-list
    ///
    /// `init` writes the initial register frame into the thread's stack
    /// region (canary already in word 0) and returns the saved stack
    /// pointer as a word offset into that region.
    pub fn add_thread<F>(
        &mut self,
        entry: ThreadFn,
        stack_size: usize,
        prio: OsPrio,
        init: F,
    ) -> OsResult<ThreadId>
    where
        F: FnOnce(&mut [OsStkElement], ThreadFn, ThreadId) -> usize,
    {
        let words = task::stack_words(stack_size)?;
        let id = ThreadId(self.next_id);

        let (idx, stack) = self.pool.alloc(id, words)?;
        let sp = init(stack, entry, id);
        self.next_id = self.next_id.wrapping_add(1);

        let tcb = self.pool.tcb_mut(idx);
        tcb.stk_ptr = tcb.stk_base + sp;
        tcb.prio = prio;
        tcb.entry = Some(entry);
        self.run_list.insert_tail(self.pool.tcbs_mut(), idx);

        // An idle CPU picks the newcomer up right away
        if self.launched && self.current().is_none() {
            self.request_switch();
        }

        Ok(id)
    }

    /// Mark the scheduler launched and request the first dispatch
    pub fn start(&mut self, time_slice: OsTick) -> OsResult<()> {
        if self.launched {
            return Err(OsError::OsRunning);
        }
        if self.run_list.is_empty() {
            return Err(OsError::NoRunnableThread);
        }

        self.launched = true;
        self.time_slice = time_slice.max(1);
        self.slice_left = self.time_slice;
        self.current = None;
        self.current_exited = false;
        self.request_switch();
        Ok(())
    }

    /// Running thread that is still on the run-list
    fn running_linked(&self) -> OsResult<usize> {
        let cur = self.current().ok_or(OsError::NotThreadContext)?;
        let tcb = self.pool.tcb(cur);
        if !tcb.is_ready() || !tcb.is_linked() {
            return Err(OsError::ThreadNotRunning);
        }
        Ok(cur)
    }

    /// Put the running thread to sleep for `ticks` ticks
    ///
    /// `ticks == 0` yields the rest of the time slice, which is a no-op
    /// with no other thread on the run-list. A real sleep is a no-op only
    /// for the last live thread; while every other thread sleeps or
    /// blocks, the idle context covers the gap.
    pub fn sleep(&mut self, ticks: OsTick) -> OsResult<()> {
        let cur = self.running_linked()?;

        if ticks == 0 {
            if self.run_list.len() > 1 {
                self.request_switch();
            }
            return Ok(());
        }

        if self.pool.live() <= 1 {
            return Ok(());
        }

        self.successor = self.run_list.remove(self.pool.tcbs_mut(), cur);
        let tcb = self.pool.tcb_mut(cur);
        tcb.state = ThreadState::Sleeping;
        tcb.sleep_ticks = ticks;
        self.request_switch();
        Ok(())
    }

    /// Remove the running thread for good and free its slot
    ///
    /// Fails with `NoRunnableThread` if it is the last live thread; the
    /// kernel treats that as fatal.
    pub fn kill_current(&mut self) -> OsResult<ThreadId> {
        let cur = self.running_linked()?;

        if self.pool.live() <= 1 {
            return Err(OsError::NoRunnableThread);
        }

        let id = self.pool.tcb(cur).id;
        self.successor = self.run_list.remove(self.pool.tcbs_mut(), cur);
        self.pool.free(cur);
        self.current_exited = true;
        self.request_switch();
        Ok(id)
    }

    /// Take the running thread off the run-list to park it on a wait queue
    pub(crate) fn block_current(&mut self) -> OsResult<usize> {
        let cur = self.running_linked()?;

        self.successor = self.run_list.remove(self.pool.tcbs_mut(), cur);
        let tcb = self.pool.tcb_mut(cur);
        tcb.state = ThreadState::Blocked;
        tcb.block_next = None;
        self.request_switch();
        Ok(cur)
    }

    /// Make a thread popped from a wait queue ready again
    pub(crate) fn unblock(&mut self, idx: usize) {
        let tcb = self.pool.tcb_mut(idx);
        debug_assert!(tcb.is_blocked());
        tcb.state = ThreadState::Ready;
        tcb.block_next = None;
        self.run_list.insert_tail(self.pool.tcbs_mut(), idx);

        if self.launched && self.current().is_none() {
            self.request_switch();
        }
    }

    #[inline]
    pub(crate) fn tcbs_mut(&mut self) -> &mut [Tcb] {
        self.pool.tcbs_mut()
    }

    // ============ Tick and dispatch ============

    /// One hardware tick: count down sleepers and the time slice
    pub fn tick(&mut self) {
        for idx in 0..self.pool.capacity() {
            let tcb = self.pool.tcb_mut(idx);
            if !tcb.is_sleeping() {
                continue;
            }
            tcb.sleep_ticks = tcb.sleep_ticks.saturating_sub(1);
            if tcb.sleep_ticks == 0 {
                tcb.state = ThreadState::Ready;
                self.run_list.insert_tail(self.pool.tcbs_mut(), idx);
            }
        }

        if !self.launched {
            return;
        }

        match self.current() {
            None => {
                if !self.run_list.is_empty() {
                    self.request_switch();
                }
            }
            Some(cur) => {
                self.slice_left = self.slice_left.saturating_sub(1);
                if self.slice_left == 0 {
                    self.slice_left = self.time_slice;
                    if self.run_list.len() > 1 || !self.pool.tcb(cur).is_linked() {
                        self.request_switch();
                    }
                }
            }
        }
    }

    /// Save the outgoing context and choose the next one
    ///
    /// `saved_sp` is the outgoing stack pointer as a word offset into its
    /// stack (`None` if there is nothing to save). Returns the slot to
    /// resume, or `None` for the idle context. A corrupted canary on the
    /// outgoing stack is reported as `StackOverflow`.
    pub fn switch_context(&mut self, saved_sp: Option<usize>) -> OsResult<Option<usize>> {
        self.switch_requested = false;

        let next = match self.current() {
            Some(cur) => {
                if let Some(sp) = saved_sp {
                    self.pool.tcb_mut(cur).stk_ptr = sp;
                }
                if !self.pool.stack_intact(cur) {
                    return Err(OsError::StackOverflow);
                }

                let tcb = self.pool.tcb(cur);
                if tcb.is_linked() {
                    tcb.next
                } else {
                    self.resume_point()
                }
            }
            None => {
                if !self.current_exited {
                    if let Some(sp) = saved_sp {
                        self.idle_sp = sp;
                    }
                }
                self.resume_point()
            }
        };

        self.current = next;
        self.current_exited = false;
        self.successor = None;
        self.slice_left = self.time_slice;

        crate::trace!("switch -> {}", next.map(|idx| self.pool.tcb(idx).id.as_u32()));
        Ok(next)
    }

    /// Where dispatch continues after the running thread left the run-list
    fn resume_point(&self) -> Option<usize> {
        self.successor
            .filter(|&idx| self.pool.tcb(idx).is_linked())
            .or(self.run_list.head())
    }

    // ============ Stack access for the port ============

    /// Stack memory of a context (`None` = idle)
    pub fn context_stack_mut(&mut self, ctx: Option<usize>) -> &mut [OsStkElement] {
        match ctx {
            Some(idx) => self.pool.stack_mut(idx),
            None => &mut self.idle_stack,
        }
    }

    /// Saved stack pointer of a context, as a word offset
    pub fn context_sp(&self, ctx: Option<usize>) -> usize {
        match ctx {
            Some(idx) => self.pool.tcb(idx).stk_ptr,
            None => self.idle_sp,
        }
    }

    /// Context whose stack the outgoing stack pointer belongs to, or
    /// `None` when there is nothing worth saving (killed thread, first launch)
    pub fn outgoing_context(&self) -> Option<Option<usize>> {
        if self.current_exited || !self.launched {
            None
        } else {
            Some(self.current)
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
