//! Run-list - circular doubly linked list of runnable TCBs
//!
//! New threads go in at the tail (just before the head) and dispatch
//! walks `next` from the running thread, which gives FIFO round-robin.

use crate::task::Tcb;

/// Circular run-list threaded through the TCB pool
///
/// A TCB is linked iff its `next`/`prev` are `Some`. In a one-element
/// list both point at the element itself.
#[derive(Debug, Clone, Copy)]
pub struct RunList {
    head: Option<usize>,
    len: usize,
}

impl RunList {
    /// Create a new empty run-list
    pub const fn new() -> Self {
        RunList { head: None, len: 0 }
    }

    /// Initialize/reset the run-list
    pub fn init(&mut self) {
        self.head = None;
        self.len = 0;
    }

    /// Head of the list (first thread dispatched at launch)
    #[inline]
    pub fn head(&self) -> Option<usize> {
        self.head
    }

    /// Tail of the list
    #[inline]
    pub fn tail(&self, tcbs: &[Tcb]) -> Option<usize> {
        self.head.and_then(|h| tcbs[h].prev)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Insert TCB at the tail of the list
    ///
    /// The TCB must not already be linked.
    pub fn insert_tail(&mut self, tcbs: &mut [Tcb], idx: usize) {
        debug_assert!(!tcbs[idx].is_linked());

        match self.head {
            Some(head) => {
                let tail = tcbs[head].prev.unwrap_or(head);
                tcbs[idx].prev = Some(tail);
                tcbs[idx].next = Some(head);
                tcbs[tail].next = Some(idx);
                tcbs[head].prev = Some(idx);
            }
            None => {
                // List is empty - this becomes head
                tcbs[idx].prev = Some(idx);
                tcbs[idx].next = Some(idx);
                self.head = Some(idx);
            }
        }

        self.len += 1;
    }

    /// Remove a TCB from the list
    ///
    /// Returns its former successor, or `None` if the list is now empty.
    pub fn remove(&mut self, tcbs: &mut [Tcb], idx: usize) -> Option<usize> {
        let (Some(next), Some(prev)) = (tcbs[idx].next, tcbs[idx].prev) else {
            debug_assert!(false, "removing an unlinked TCB");
            return self.head;
        };

        let successor = if next == idx {
            // Last element
            self.head = None;
            None
        } else {
            tcbs[prev].next = Some(next);
            tcbs[next].prev = Some(prev);
            if self.head == Some(idx) {
                self.head = Some(next);
            }
            Some(next)
        };

        // Clear TCB's list pointers
        tcbs[idx].next = None;
        tcbs[idx].prev = None;
        self.len -= 1;

        successor
    }

    /// Walk the list once, starting at the head
    pub fn iter<'a>(&self, tcbs: &'a [Tcb]) -> RunListIter<'a> {
        RunListIter {
            tcbs,
            cursor: self.head,
            remaining: self.len,
        }
    }
}

impl Default for RunList {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over run-list slots in dispatch order
pub struct RunListIter<'a> {
    tcbs: &'a [Tcb],
    cursor: Option<usize>,
    remaining: usize,
}

impl Iterator for RunListIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.cursor?;
        self.remaining -= 1;
        self.cursor = self.tcbs[idx].next;
        Some(idx)
    }
}
