//! Kernel object
//!
//! [`Kernel`] owns all kernel state: the scheduler, the tick clock and
//! the interrupt task tables. It is generic over the [`Port`] that
//! supplies the CPU-specific pieces, and `const`-constructible so the
//! target build keeps a single instance in a `static`.
//!
//! Scheduler state is only touched inside a critical section. A context
//! switch requested while the section was held is handed to the port
//! after the section ends.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::CFG_TICK_PERIOD;
use crate::core::cs_cell::CsCell;
use crate::critical::{critical_section, CriticalSection};
use crate::error::{os_trap, OsError, OsResult};
use crate::event::{EventSource, EventTable};
use crate::periodic::{JitterStats, PeriodicTable};
use crate::port::Port;
use crate::sched::Scheduler;
use crate::time::SystemClock;
use crate::types::{OsPrio, OsStkElement, OsTick, OsTime, SlotId, TaskFn, ThreadFn, ThreadId, ThreadState};

#[cfg(feature = "stats")]
use crate::stats::IntsDisabled;
#[cfg(feature = "stats")]
use crate::trace::{TraceBuffer, TraceEvent, TraceRecord};

// ============ Kernel State Structures ============

/// Atomic kernel flags
pub struct KernelFlags {
    initialized: AtomicBool,
    running: AtomicBool,
}

impl KernelFlags {
    const fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            running: AtomicBool::new(false),
        }
    }

    /// Check if the OS is running
    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Check if OS is initialized
    #[inline(always)]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    #[inline(always)]
    fn set_initialized(&self, val: bool) {
        self.initialized.store(val, Ordering::Release);
    }

    #[inline(always)]
    fn set_running(&self, val: bool) {
        self.running.store(val, Ordering::Release);
    }
}

/// Outcome of a context switch, handed back to the port
#[derive(Debug, Clone, Copy)]
pub struct ContextSwitch {
    /// Stack pointer to restore
    pub sp: *mut OsStkElement,
    /// Thread being resumed, `None` for the idle context
    pub thread: Option<ThreadId>,
}

/// The kernel
pub struct Kernel<P: Port> {
    flags: KernelFlags,
    clock: SystemClock,
    sched: CsCell<Scheduler>,
    periodic: CsCell<PeriodicTable>,
    events: CsCell<EventTable>,
    #[cfg(feature = "stats")]
    trace: CsCell<TraceBuffer>,
    port: P,
}

impl<P: Port> Kernel<P> {
    pub const fn new(port: P) -> Self {
        Self {
            flags: KernelFlags::new(),
            clock: SystemClock::new(),
            sched: CsCell::new(Scheduler::new()),
            periodic: CsCell::new(PeriodicTable::new()),
            events: CsCell::new(EventTable::new()),
            #[cfg(feature = "stats")]
            trace: CsCell::new(TraceBuffer::new()),
            port,
        }
    }

    #[inline(always)]
    pub fn port(&self) -> &P {
        &self.port
    }

    #[inline(always)]
    pub fn flags(&self) -> &KernelFlags {
        &self.flags
    }

    /// Run `f` on the scheduler inside a critical section, then forward
    /// any switch it requested to the port
    pub(crate) fn with_sched<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CriticalSection, &mut Scheduler) -> R,
    {
        let (result, pend) = critical_section(|cs| {
            let sched = self.sched.get(cs);
            let result = f(cs, sched);
            let pend = self.flags.is_running() && sched.take_switch_request();
            (result, pend)
        });

        if pend {
            self.port.pend_switch(self);
        }
        result
    }

    /// Read-only view of the scheduler
    pub fn inspect<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Scheduler) -> R,
    {
        critical_section(|cs| f(self.sched.get(cs)))
    }

    // ============ Lifecycle ============

    /// Initialize the kernel
    ///
    /// Must be called before any other kernel function. Clears the thread
    /// pool, the task slots and the clock, and builds the idle context.
    pub fn init(&self) -> OsResult<()> {
        if self.flags.is_running() {
            return Err(OsError::OsRunning);
        }

        critical_section(|cs| {
            let sched = self.sched.get(cs);
            sched.reset();
            sched.init_idle(|stack| self.port.init_idle_stack(stack));
            self.periodic.get(cs).reset();
            self.events.get(cs).reset();
            #[cfg(feature = "stats")]
            self.trace.get(cs).reset();
        });
        self.clock.reset();
        self.flags.set_initialized(true);

        crate::info!("kernel initialized");
        Ok(())
    }

    /// Add a foreground thread
    ///
    /// `stack_size` is in bytes. Allowed before launch and from interrupt
    /// context; the new thread joins the tail of the run-list.
    pub fn add_thread(&'static self, entry: ThreadFn, stack_size: usize, prio: OsPrio) -> OsResult<ThreadId> {
        if !self.flags.is_initialized() {
            return Err(OsError::OsNotInit);
        }

        let result = self.with_sched(|_, sched| {
            sched.add_thread(entry, stack_size, prio, |stack, entry, id| {
                self.port.init_stack(self, stack, entry, id)
            })
        });

        match result {
            Ok(id) => crate::debug!("thread {} added", id.as_u32()),
            Err(err) => crate::warn!("add_thread failed: {}", err),
        }
        result
    }

    /// Mark the kernel running and queue the first dispatch
    ///
    /// The port's start routine (or a hosted driver) performs it.
    pub fn start_scheduler(&self, time_slice: OsTick) -> OsResult<()> {
        if !self.flags.is_initialized() {
            return Err(OsError::OsNotInit);
        }
        if self.flags.is_running() {
            return Err(OsError::OsRunning);
        }

        critical_section(|cs| self.sched.get(cs).start(time_slice))?;
        self.flags.set_running(true);

        crate::info!("scheduler started, time slice {} ticks", time_slice);
        Ok(())
    }

    /// Start multitasking. Never returns.
    ///
    /// Traps if the kernel is not initialized, already running, or has no
    /// thread to run.
    pub fn launch(&'static self, time_slice: OsTick) -> ! {
        if let Err(err) = self.start_scheduler(time_slice) {
            os_trap(err);
        }
        self.port.start_first(self)
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.flags.is_running()
    }

    // ============ Thread calls ============

    /// Sleep for `ticks` ticks; zero yields the rest of the time slice
    pub fn sleep(&self, ticks: OsTick) -> OsResult<()> {
        if self.port.in_isr() {
            return Err(OsError::SleepIsr);
        }
        if !self.flags.is_running() {
            return Err(OsError::OsNotRunning);
        }

        self.with_sched(|_, sched| sched.sleep(ticks))
    }

    /// Give up the rest of the time slice
    #[inline]
    pub fn suspend(&self) -> OsResult<()> {
        self.sleep(0)
    }

    /// Kill the running thread and request a switch away from it
    ///
    /// Only returns once the switch has been requested; a thread caller is
    /// never resumed. Killing the last live thread is fatal.
    pub fn try_kill_current(&self) -> OsResult<ThreadId> {
        if self.port.in_isr() {
            return Err(OsError::KillIsr);
        }
        if !self.flags.is_running() {
            return Err(OsError::OsNotRunning);
        }

        let result = self.with_sched(|_, sched| sched.kill_current());
        match result {
            Ok(id) => crate::debug!("thread {} killed", id.as_u32()),
            Err(err) if err.is_fatal() => os_trap(err),
            Err(err) => crate::warn!("kill rejected: {}", err),
        }
        result
    }

    /// Kill the running thread. Never returns.
    pub fn kill_current(&self) -> ! {
        if let Err(err) = self.try_kill_current() {
            os_trap(err);
        }
        loop {
            self.port.wait_for_interrupt();
        }
    }

    /// Id of the running thread, `None` while idle
    pub fn current_id(&self) -> Option<ThreadId> {
        self.inspect(Scheduler::current_id)
    }

    /// Number of live threads
    pub fn thread_count(&self) -> usize {
        self.inspect(Scheduler::thread_count)
    }

    /// State of a live thread, `None` once it is dead
    pub fn thread_state(&self, id: ThreadId) -> Option<ThreadState> {
        self.inspect(|sched| sched.thread_state(id))
    }

    // ============ Time ============

    /// Tick interrupt body: advance the clock, wake sleepers, run the slice
    pub fn tick(&self) {
        self.clock.tick();
        self.with_sched(|_, sched| sched.tick());
    }

    /// Current time in core clock cycles (wraps at 2^32)
    ///
    /// Tick count times the tick period, plus how far the tick timer has
    /// run into the current period.
    pub fn current_time(&self) -> OsTime {
        critical_section(|_| {
            let phase = self.port.tick_phase();
            let mut ticks = self.clock.ticks();
            if phase.pending {
                ticks = ticks.wrapping_add(1);
            }
            ticks.wrapping_mul(CFG_TICK_PERIOD).wrapping_add(phase.elapsed)
        })
    }

    /// Milliseconds (ticks) since init or the last `clear_ms_time`
    #[inline]
    pub fn ms_time(&self) -> OsTick {
        self.clock.ticks()
    }

    #[inline]
    pub fn clear_ms_time(&self) {
        self.clock.reset();
    }

    // ============ Context switch ============

    /// Whether the switch handler should push the outgoing registers
    ///
    /// False before the first dispatch and after the running thread was
    /// killed: its slot may already belong to a new thread.
    pub fn saves_outgoing(&self) -> bool {
        self.inspect(|sched| sched.outgoing_context().is_some())
    }

    /// Save the outgoing context and pick the next one
    ///
    /// Called by the port from the lowest-priority switch handler with the
    /// outgoing stack pointer (null when there is nothing to save).
    pub fn switch_context(&self, saved_sp: *mut OsStkElement) -> ContextSwitch {
        critical_section(|cs| {
            let sched = self.sched.get(cs);

            let saved = if saved_sp.is_null() {
                None
            } else {
                sched.outgoing_context().map(|ctx| {
                    let base = sched.context_stack_mut(ctx).as_ptr() as usize;
                    (saved_sp as usize).wrapping_sub(base) / core::mem::size_of::<OsStkElement>()
                })
            };

            let next = match sched.switch_context(saved) {
                Ok(next) => next,
                Err(err) => os_trap(err),
            };

            let thread = next.map(|idx| sched.pool().tcb(idx).id);
            let offset = sched.context_sp(next);
            let sp = sched.context_stack_mut(next).as_mut_ptr().wrapping_add(offset);

            #[cfg(feature = "stats")]
            if thread.is_some() {
                self.trace_event(cs, thread, TraceEvent::ThreadStart);
            }

            ContextSwitch { sp, thread }
        })
    }

    // ============ Periodic tasks ============

    /// Register a periodic task
    ///
    /// `period` is in core clock cycles, the unit of `current_time`.
    pub fn add_periodic_task(&self, task: TaskFn, period: u32, prio: OsPrio) -> OsResult<SlotId> {
        if !self.flags.is_initialized() {
            return Err(OsError::OsNotInit);
        }

        let slot = critical_section(|cs| self.periodic.get(cs).register(task, period, prio))
            .inspect_err(|err| crate::warn!("periodic task rejected: {}", err))?;

        self.port.arm_periodic(slot, period, prio);
        crate::debug!("periodic task in slot {}, period {}", slot, period);
        Ok(slot)
    }

    /// Timer interrupt body for a periodic slot
    pub fn run_periodic(&self, slot: SlotId) {
        let now = self.current_time();
        let task = critical_section(|cs| self.periodic.get(cs).dispatch(slot, now));
        if let Some(task) = task {
            #[cfg(feature = "stats")]
            self.trace_current(TraceEvent::PeriodicStart(slot));
            task();
            #[cfg(feature = "stats")]
            self.trace_current(TraceEvent::PeriodicStop(slot));
        }
    }

    pub fn periodic_jitter(&self, slot: SlotId) -> OsResult<JitterStats> {
        critical_section(|cs| self.periodic.get(cs).jitter(slot))
    }

    // ============ Event tasks ============

    /// Attach a task to an edge interrupt source
    pub fn add_event_task(&self, source: EventSource, task: TaskFn, prio: OsPrio) -> OsResult<()> {
        if !self.flags.is_initialized() {
            return Err(OsError::OsNotInit);
        }

        critical_section(|cs| self.events.get(cs).register(source, task, prio))
            .inspect_err(|err| crate::warn!("event task rejected: {}", err))?;

        self.port.enable_event(source, prio);
        Ok(())
    }

    /// Edge interrupt body for an event source
    pub fn run_event(&self, source: EventSource) {
        let task = critical_section(|cs| self.events.get(cs).task(source));
        if let Some(task) = task {
            task();
        }
    }

    // ============ Statistics ============

    /// Interrupt-masking statistics of the CPU
    #[cfg(feature = "stats")]
    pub fn ints_disabled(&self) -> IntsDisabled {
        crate::stats::ints_disabled()
    }

    #[cfg(feature = "stats")]
    pub fn clear_ints_disabled(&self) {
        crate::stats::clear();
    }

    /// Read the dispatch trace
    #[cfg(feature = "stats")]
    pub fn with_trace<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&TraceBuffer) -> R,
    {
        critical_section(|cs| f(self.trace.get(cs)))
    }

    /// Empty the dispatch trace so it records again
    #[cfg(feature = "stats")]
    pub fn clear_trace(&self) {
        critical_section(|cs| self.trace.get(cs).reset());
    }

    #[cfg(feature = "stats")]
    fn trace_event(&self, cs: &CriticalSection, thread: Option<ThreadId>, event: TraceEvent) {
        let time = self.current_time();
        self.trace.get(cs).record(TraceRecord { thread, event, time });
    }

    #[cfg(feature = "stats")]
    fn trace_current(&self, event: TraceEvent) {
        critical_section(|cs| {
            let thread = self.sched.get(cs).current_id();
            self.trace_event(cs, thread, event);
        });
    }
}
