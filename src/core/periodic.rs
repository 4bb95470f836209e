//! Periodic task slots
//!
//! A periodic task is a plain callback that a hardware timer interrupt
//! runs to completion once per period. It never blocks; it may signal a
//! semaphore, put into a FIFO or add a thread.
//!
//! Every dispatch also feeds the slot's jitter statistics: the time since
//! the previous dispatch is compared with the configured period.

use crate::config::{CFG_JITTER_RESOLUTION, CFG_JITTER_SIZE, CFG_PERIODIC_SLOTS};
use crate::error::{OsError, OsResult};
use crate::time::time_difference;
use crate::types::{OsPrio, OsTime, SlotId, TaskFn};

/// Dispatch timing of one periodic slot
///
/// Jitter values are in units of `CFG_JITTER_RESOLUTION` time units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterStats {
    last: Option<OsTime>,
    /// Largest deviation seen so far
    pub max: u32,
    /// Number of dispatches measured (the first one only sets the reference)
    pub samples: u32,
    /// Deviation histogram; the last bucket collects everything larger
    pub histogram: [u32; CFG_JITTER_SIZE],
}

impl JitterStats {
    pub const fn new() -> Self {
        Self {
            last: None,
            max: 0,
            samples: 0,
            histogram: [0; CFG_JITTER_SIZE],
        }
    }

    /// Record a dispatch at time `now` for a task with the given period
    pub fn record(&mut self, now: OsTime, period: u32) {
        if let Some(last) = self.last {
            let elapsed = time_difference(last, now);
            let jitter = (elapsed.abs_diff(period) + CFG_JITTER_RESOLUTION / 2) / CFG_JITTER_RESOLUTION;

            self.max = self.max.max(jitter);
            let bucket = (jitter as usize).min(CFG_JITTER_SIZE - 1);
            self.histogram[bucket] = self.histogram[bucket].saturating_add(1);
            self.samples = self.samples.saturating_add(1);
        }
        self.last = Some(now);
    }
}

impl Default for JitterStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
struct PeriodicSlot {
    task: TaskFn,
    period: u32,
    prio: OsPrio,
    stats: JitterStats,
}

/// The fixed set of periodic slots; a slot is never reassigned
pub struct PeriodicTable {
    slots: [Option<PeriodicSlot>; CFG_PERIODIC_SLOTS],
}

impl PeriodicTable {
    pub const fn new() -> Self {
        Self {
            slots: [None; CFG_PERIODIC_SLOTS],
        }
    }

    pub fn reset(&mut self) {
        self.slots = [None; CFG_PERIODIC_SLOTS];
    }

    /// Claim the first free slot
    pub fn register(&mut self, task: TaskFn, period: u32, prio: OsPrio) -> OsResult<SlotId> {
        if period == 0 {
            return Err(OsError::PeriodInvalid);
        }

        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(OsError::CapacityExceeded)?;

        self.slots[slot] = Some(PeriodicSlot {
            task,
            period,
            prio,
            stats: JitterStats::new(),
        });
        Ok(slot)
    }

    /// Note a dispatch at `now` and hand back the callback to run
    pub fn dispatch(&mut self, slot: SlotId, now: OsTime) -> Option<TaskFn> {
        let entry = self.slots.get_mut(slot)?.as_mut()?;
        entry.stats.record(now, entry.period);
        Some(entry.task)
    }

    pub fn jitter(&self, slot: SlotId) -> OsResult<JitterStats> {
        self.slot(slot).map(|s| s.stats)
    }

    pub fn period(&self, slot: SlotId) -> OsResult<u32> {
        self.slot(slot).map(|s| s.period)
    }

    pub fn priority(&self, slot: SlotId) -> OsResult<OsPrio> {
        self.slot(slot).map(|s| s.prio)
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, slot: SlotId) -> OsResult<&PeriodicSlot> {
        self.slots
            .get(slot)
            .and_then(Option::as_ref)
            .ok_or(OsError::SlotInvalid)
    }
}

impl Default for PeriodicTable {
    fn default() -> Self {
        Self::new()
    }
}
