//! Thread pool
//!
//! A fixed-capacity arena of TCBs. Slot `i` owns stack region `i` for the
//! life of the system; killing a thread only marks the slot free again.

mod tcb;

pub use tcb::Tcb;

use crate::config::{CFG_MAX_THREADS, CFG_STACK_CANARY, CFG_STK_SIZE, CFG_STK_SIZE_MIN};
use crate::error::{OsError, OsResult};
use crate::types::{OsStkElement, ThreadId, ThreadState};

/// Convert a stack request in bytes to a word count
///
/// The request must be a multiple of 8 bytes (double-word aligned frames)
/// and fit a pool slot.
pub fn stack_words(stack_size: usize) -> OsResult<usize> {
    if stack_size % 8 != 0 {
        return Err(OsError::StkSizeInvalid);
    }
    let words = stack_size / core::mem::size_of::<OsStkElement>();
    if !(CFG_STK_SIZE_MIN..=CFG_STK_SIZE).contains(&words) {
        return Err(OsError::StkSizeInvalid);
    }
    Ok(words)
}

/// Fixed pool of TCBs and their stacks
pub struct TcbPool {
    tcbs: [Tcb; CFG_MAX_THREADS],
    stacks: [[OsStkElement; CFG_STK_SIZE]; CFG_MAX_THREADS],
    live: usize,
}

impl TcbPool {
    pub const fn new() -> Self {
        TcbPool {
            tcbs: [Tcb::new(); CFG_MAX_THREADS],
            stacks: [[0; CFG_STK_SIZE]; CFG_MAX_THREADS],
            live: 0,
        }
    }

    /// Free every slot
    pub fn reset(&mut self) {
        self.tcbs = [Tcb::new(); CFG_MAX_THREADS];
        self.live = 0;
    }

    /// Number of slots holding a live thread
    #[inline]
    pub fn live(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        CFG_MAX_THREADS
    }

    /// Claim the lowest free slot and prepare its stack region
    ///
    /// The canary is written at the base of the `words` used; the returned
    /// slice is the used region, bottom first.
    pub fn alloc(&mut self, id: ThreadId, words: usize) -> OsResult<(usize, &mut [OsStkElement])> {
        let idx = self
            .tcbs
            .iter()
            .position(|t| !t.is_active())
            .ok_or(OsError::CapacityExceeded)?;

        let base = CFG_STK_SIZE - words;
        let tcb = &mut self.tcbs[idx];
        *tcb = Tcb::new();
        tcb.id = id;
        tcb.stk_base = base;
        tcb.state = ThreadState::Ready;
        self.live += 1;

        let stack = &mut self.stacks[idx][base..];
        stack.fill(0);
        stack[0] = CFG_STACK_CANARY;
        Ok((idx, stack))
    }

    /// Return a slot to the pool. The caller has already unlinked it.
    pub fn free(&mut self, idx: usize) {
        let tcb = &mut self.tcbs[idx];
        debug_assert!(tcb.is_active());
        debug_assert!(tcb.next.is_none() && tcb.block_next.is_none());
        tcb.state = ThreadState::Dead;
        tcb.sleep_ticks = 0;
        self.live -= 1;
    }

    #[inline]
    pub fn tcb(&self, idx: usize) -> &Tcb {
        &self.tcbs[idx]
    }

    #[inline]
    pub fn tcb_mut(&mut self, idx: usize) -> &mut Tcb {
        &mut self.tcbs[idx]
    }

    #[inline]
    pub fn tcbs(&self) -> &[Tcb] {
        &self.tcbs
    }

    #[inline]
    pub fn tcbs_mut(&mut self) -> &mut [Tcb] {
        &mut self.tcbs
    }

    /// Slot of a live thread
    pub fn find(&self, id: ThreadId) -> Option<usize> {
        self.tcbs.iter().position(|t| t.is_active() && t.id == id)
    }

    /// Whole stack region of a slot
    #[inline]
    pub fn stack(&self, idx: usize) -> &[OsStkElement; CFG_STK_SIZE] {
        &self.stacks[idx]
    }

    #[inline]
    pub fn stack_mut(&mut self, idx: usize) -> &mut [OsStkElement; CFG_STK_SIZE] {
        &mut self.stacks[idx]
    }

    /// Canary intact and the saved stack pointer inside the used region
    pub fn stack_intact(&self, idx: usize) -> bool {
        let tcb = &self.tcbs[idx];
        self.stacks[idx][tcb.stk_base] == CFG_STACK_CANARY && tcb.stk_ptr > tcb.stk_base
    }
}

impl Default for TcbPool {
    fn default() -> Self {
        Self::new()
    }
}
