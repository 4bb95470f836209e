//! Application API for the Cortex-M4 target
//!
//! One kernel instance in a `static` plus thin wrappers. Board code binds
//! its periodic timer and button interrupts to [`os_periodic_isr`] and
//! [`os_event_isr`].

use crate::error::OsResult;
use crate::event::EventSource;
use crate::kernel::Kernel;
use crate::periodic::JitterStats;
use crate::port::CortexM4;
use crate::types::{OsPrio, OsTick, OsTime, SlotId, TaskFn, ThreadFn, ThreadId};

#[cfg(feature = "stats")]
use crate::trace::TraceBuffer;

#[cfg(feature = "fifo")]
use crate::config::CFG_FIFO_SIZE;
#[cfg(feature = "fifo")]
use crate::sync::fifo::Fifo;
#[cfg(feature = "mailbox")]
use crate::sync::mailbox::Mailbox;
#[cfg(feature = "sem")]
use crate::sync::sem::Semaphore;

/// The kernel
pub static KERNEL: Kernel<CortexM4> = Kernel::new(CortexM4::new());

#[cfg(feature = "fifo")]
static FIFO: Fifo<u32, CFG_FIFO_SIZE> = Fifo::new();

#[cfg(feature = "mailbox")]
static MAILBOX: Mailbox<u32> = Mailbox::new();

// ============ Lifecycle ============

pub fn os_init() -> OsResult<()> {
    KERNEL.init()?;
    #[cfg(feature = "stats")]
    crate::stats::set_clock(|| KERNEL.current_time());
    Ok(())
}

pub fn os_add_thread(entry: ThreadFn, stack_size: usize, prio: OsPrio) -> OsResult<ThreadId> {
    KERNEL.add_thread(entry, stack_size, prio)
}

pub fn os_add_periodic_task(task: TaskFn, period: u32, prio: OsPrio) -> OsResult<SlotId> {
    KERNEL.add_periodic_task(task, period, prio)
}

pub fn os_add_event_task(source: EventSource, task: TaskFn, prio: OsPrio) -> OsResult<()> {
    KERNEL.add_event_task(source, task, prio)
}

/// Start the first thread; `time_slice` is in ticks
pub fn os_launch(time_slice: OsTick) -> ! {
    KERNEL.launch(time_slice)
}

// ============ Threads ============

pub fn os_sleep(ticks: OsTick) -> OsResult<()> {
    KERNEL.sleep(ticks)
}

pub fn os_suspend() -> OsResult<()> {
    KERNEL.suspend()
}

pub fn os_kill() -> ! {
    KERNEL.kill_current()
}

/// Id of the running thread; `None` from the idle context
pub fn os_id() -> Option<ThreadId> {
    KERNEL.current_id()
}

// ============ Semaphores ============

#[cfg(feature = "sem")]
pub fn os_init_semaphore(sem: &Semaphore, value: i32) {
    sem.init(value);
}

#[cfg(feature = "sem")]
pub fn os_wait(sem: &Semaphore) -> OsResult<()> {
    KERNEL.wait(sem)
}

#[cfg(feature = "sem")]
pub fn os_signal(sem: &Semaphore) {
    KERNEL.signal(sem)
}

#[cfg(feature = "sem")]
pub fn os_bwait(sem: &Semaphore) -> OsResult<()> {
    KERNEL.bwait(sem)
}

#[cfg(feature = "sem")]
pub fn os_bsignal(sem: &Semaphore) {
    KERNEL.bsignal(sem)
}

// ============ FIFO ============

/// Reset the FIFO; 0 or anything above `CFG_FIFO_SIZE` means full size
#[cfg(feature = "fifo")]
pub fn os_fifo_init(capacity: usize) {
    FIFO.init(capacity);
}

/// Non-blocking put, safe from interrupt handlers
#[cfg(feature = "fifo")]
pub fn os_fifo_put(data: u32) -> bool {
    FIFO.put(&KERNEL, data)
}

#[cfg(feature = "fifo")]
pub fn os_fifo_get() -> OsResult<u32> {
    FIFO.get(&KERNEL)
}

#[cfg(feature = "fifo")]
pub fn os_fifo_size() -> isize {
    FIFO.size()
}

// ============ Mailbox ============

#[cfg(feature = "mailbox")]
pub fn os_mailbox_init() {
    MAILBOX.init();
}

#[cfg(feature = "mailbox")]
pub fn os_mailbox_send(data: u32) -> OsResult<()> {
    MAILBOX.send(&KERNEL, data)
}

#[cfg(feature = "mailbox")]
pub fn os_mailbox_recv() -> OsResult<u32> {
    MAILBOX.recv(&KERNEL)
}

// ============ Time ============

pub fn os_time() -> OsTime {
    KERNEL.current_time()
}

pub fn os_time_difference(start: OsTime, end: OsTime) -> OsTime {
    crate::time::time_difference(start, end)
}

pub fn os_ms_time() -> OsTick {
    KERNEL.ms_time()
}

pub fn os_clear_ms_time() {
    KERNEL.clear_ms_time()
}

pub fn os_periodic_jitter(slot: SlotId) -> OsResult<JitterStats> {
    KERNEL.periodic_jitter(slot)
}

// ============ Statistics ============

/// Longest stretch with interrupts masked, in core cycles
#[cfg(feature = "stats")]
pub fn os_max_time_ints_disabled() -> OsTime {
    KERNEL.ints_disabled().max
}

/// Total time with interrupts masked since init or the last clear
#[cfg(feature = "stats")]
pub fn os_time_ints_disabled() -> u64 {
    KERNEL.ints_disabled().total
}

#[cfg(feature = "stats")]
pub fn os_percent_ints_disabled() -> u32 {
    KERNEL.ints_disabled().percent
}

#[cfg(feature = "stats")]
pub fn os_clear_ints_disabled() {
    KERNEL.clear_ints_disabled()
}

#[cfg(feature = "stats")]
pub fn os_trace<F, R>(f: F) -> R
where
    F: FnOnce(&TraceBuffer) -> R,
{
    KERNEL.with_trace(f)
}

#[cfg(feature = "stats")]
pub fn os_clear_trace() {
    KERNEL.clear_trace()
}

// ============ Interrupt entry points ============

/// Body of the timer interrupt behind a periodic slot
pub fn os_periodic_isr(slot: SlotId) {
    KERNEL.run_periodic(slot)
}

/// Body of a button edge interrupt
pub fn os_event_isr(source: EventSource) {
    KERNEL.run_event(source)
}
