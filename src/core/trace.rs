//! Dispatch trace
//!
//! Keeps the first `CFG_TRACE_SIZE` thread dispatches and periodic task
//! runs with their time stamps. Later events are dropped, so the buffer
//! holds the start-up sequence.

use crate::config::CFG_TRACE_SIZE;
use crate::types::{OsTime, SlotId, ThreadId};

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TraceEvent {
    /// A thread was switched in
    ThreadStart,
    /// A periodic task is about to run
    PeriodicStart(SlotId),
    /// A periodic task returned
    PeriodicStop(SlotId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TraceRecord {
    /// Thread on the CPU when the event happened, `None` while idle
    pub thread: Option<ThreadId>,
    pub event: TraceEvent,
    /// `current_time` of the event
    pub time: OsTime,
}

const EMPTY: TraceRecord = TraceRecord {
    thread: None,
    event: TraceEvent::ThreadStart,
    time: 0,
};

/// Fixed-size trace buffer
pub struct TraceBuffer {
    records: [TraceRecord; CFG_TRACE_SIZE],
    len: usize,
}

impl TraceBuffer {
    pub const fn new() -> Self {
        TraceBuffer {
            records: [EMPTY; CFG_TRACE_SIZE],
            len: 0,
        }
    }

    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Append a record; false once the buffer is full
    pub fn record(&mut self, record: TraceRecord) -> bool {
        match self.records.get_mut(self.len) {
            Some(slot) => {
                *slot = record;
                self.len += 1;
                true
            }
            None => false,
        }
    }

    /// Records in the order they happened
    #[inline]
    pub fn records(&self) -> &[TraceRecord] {
        &self.records[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == CFG_TRACE_SIZE
    }
}

impl Default for TraceBuffer {
    fn default() -> Self {
        Self::new()
    }
}
