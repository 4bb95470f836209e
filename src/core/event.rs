//! Edge-triggered (button) task slots
//!
//! Each input has room for exactly one callback, run to completion from
//! the input's edge interrupt.

use crate::error::{OsError, OsResult};
use crate::types::{OsPrio, TaskFn};

/// Edge interrupt sources that can carry an event task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventSource {
    /// Switch 1
    Sw1,
    /// Switch 2
    Sw2,
}

impl EventSource {
    pub const ALL: [EventSource; 2] = [EventSource::Sw1, EventSource::Sw2];

    #[inline]
    const fn index(self) -> usize {
        match self {
            EventSource::Sw1 => 0,
            EventSource::Sw2 => 1,
        }
    }
}

#[derive(Clone, Copy)]
struct EventSlot {
    task: TaskFn,
    prio: OsPrio,
}

pub struct EventTable {
    slots: [Option<EventSlot>; EventSource::ALL.len()],
}

impl EventTable {
    pub const fn new() -> Self {
        Self {
            slots: [None; EventSource::ALL.len()],
        }
    }

    pub fn reset(&mut self) {
        self.slots = [None; EventSource::ALL.len()];
    }

    pub fn register(&mut self, source: EventSource, task: TaskFn, prio: OsPrio) -> OsResult<()> {
        let slot = &mut self.slots[source.index()];
        if slot.is_some() {
            return Err(OsError::AlreadyRegistered);
        }
        *slot = Some(EventSlot { task, prio });
        Ok(())
    }

    pub fn task(&self, source: EventSource) -> Option<TaskFn> {
        self.slots[source.index()].map(|s| s.task)
    }

    pub fn priority(&self, source: EventSource) -> Option<OsPrio> {
        self.slots[source.index()].map(|s| s.prio)
    }
}

impl Default for EventTable {
    fn default() -> Self {
        Self::new()
    }
}
