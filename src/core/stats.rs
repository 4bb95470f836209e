//! Interrupt-masking statistics
//!
//! Every outermost critical section is timed from entry to exit against a
//! clock installed with [`set_clock`]; on the target `os_init` installs
//! the kernel's `current_time`. Nested sections count as part of the
//! outermost one. Nothing is measured until a clock is installed.
//!
//! The percentage is taken over the window since the clock was installed
//! or the statistics were cleared, and is only meaningful for windows
//! shorter than one wrap of the 32-bit clock.

use crate::core::cs_cell::CsCell;
use crate::critical::{critical_section, CriticalSection};
use crate::time::time_difference;
use crate::types::OsTime;

/// Interrupt-masking statistics, in clock units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IntsDisabled {
    /// Longest single stretch with interrupts masked
    pub max: OsTime,
    /// Sum of all stretches in the window
    pub total: u64,
    /// `total` as a percentage of the window
    pub percent: u32,
}

struct Meter {
    clock: Option<fn() -> OsTime>,
    depth: u32,
    entered: OsTime,
    since: OsTime,
    max: OsTime,
    total: u64,
}

static METER: CsCell<Meter> = CsCell::new(Meter {
    clock: None,
    depth: 0,
    entered: 0,
    since: 0,
    max: 0,
    total: 0,
});

// The clock takes its own critical section: it runs while `depth` is
// already 1, so it nests instead of recursing into the meter.

pub(crate) fn on_enter(cs: &CriticalSection) {
    let meter = METER.get(cs);
    meter.depth += 1;
    if meter.depth > 1 {
        return;
    }

    if let Some(clock) = meter.clock {
        let now = clock();
        METER.get(cs).entered = now;
    }
}

pub(crate) fn on_exit(cs: &CriticalSection) {
    let meter = METER.get(cs);
    if meter.depth > 1 {
        meter.depth -= 1;
        return;
    }

    if let Some(clock) = meter.clock {
        let now = clock();
        let meter = METER.get(cs);
        let held = time_difference(meter.entered, now);
        meter.max = meter.max.max(held);
        meter.total += u64::from(held);
    }
    METER.get(cs).depth = 0;
}

/// Install the clock and start a fresh window
pub fn set_clock(clock: fn() -> OsTime) {
    critical_section(|cs| {
        let now = clock();
        let meter = METER.get(cs);
        meter.clock = Some(clock);
        meter.entered = now;
        restart(meter, now);
    });
}

/// Zero the statistics and start a fresh window
pub fn clear() {
    critical_section(|cs| {
        let clock = METER.get(cs).clock;
        let now = clock.map_or(0, |clock| clock());
        restart(METER.get(cs), now);
    });
}

fn restart(meter: &mut Meter, now: OsTime) {
    meter.since = now;
    meter.max = 0;
    meter.total = 0;
}

/// Statistics for the current window
pub fn ints_disabled() -> IntsDisabled {
    critical_section(|cs| {
        let meter = METER.get(cs);
        let (clock, since, max, total) = (meter.clock, meter.since, meter.max, meter.total);

        let window = clock.map_or(0, |clock| time_difference(since, clock()));
        let percent = match window {
            0 => 0,
            window => (total * 100 / u64::from(window)).min(100) as u32,
        };

        IntsDisabled { max, total, percent }
    })
}
