//! Hosted port for running the kernel on a development machine
//!
//! Every kernel thread is backed by a std thread and a baton decides which
//! context may run: exactly one of them (or the test's main thread, acting
//! as the idle context) holds it at a time. A context switch hands the
//! baton to whatever the kernel picked, unparks that std thread and parks
//! the caller until it is chosen again.
//!
//! Ticks raised by a running thread switch on the spot. Work done through
//! [`HostedPort::interrupt`] behaves like an interrupt handler instead:
//! `in_isr` reports true and a requested switch waits until it returns,
//! as PendSV would.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use rtos::{Kernel, Port, ThreadFn, ThreadId};

/// Stack request used by the hosted tests, in bytes
pub const STACK: usize = 512;

/// Upper bound for a whole hosted scenario
pub const TIMEOUT: Duration = Duration::from_secs(60);

/// Which context owns the emulated CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Idle,
    Thread(ThreadId),
}

pub struct HostedPort {
    baton: Mutex<Context>,
    threads: Mutex<Vec<(Context, Thread)>>,
    in_interrupt: AtomicBool,
    deferred: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HostedPort {
    pub const fn new() -> Self {
        HostedPort {
            baton: Mutex::new(Context::Idle),
            threads: Mutex::new(Vec::new()),
            in_interrupt: AtomicBool::new(false),
            deferred: AtomicBool::new(false),
        }
    }

    /// Context currently holding the baton
    pub fn running(&self) -> Context {
        *lock(&self.baton)
    }

    fn register(&self, ctx: Context, thread: Thread) {
        lock(&self.threads).push((ctx, thread));
    }

    fn hand_over(&self, next: Context) {
        *lock(&self.baton) = next;

        let target = lock(&self.threads)
            .iter()
            .rev()
            .find(|(ctx, _)| *ctx == next)
            .map(|(_, thread)| thread.clone());
        if let Some(thread) = target {
            thread.unpark();
        }
    }

    fn wait_for_turn(&self, me: Context) {
        let deadline = Instant::now() + TIMEOUT;
        while self.running() != me {
            match me {
                // The idle context is the test itself; don't hang the suite
                Context::Idle => {
                    assert!(Instant::now() < deadline, "no context switched back to idle");
                    thread::park_timeout(Duration::from_millis(10));
                }
                Context::Thread(_) => thread::park(),
            }
        }
    }

    /// Run `handler` as an interrupt taken in the current context
    pub fn interrupt<F: FnOnce()>(&self, kernel: &Kernel<Self>, handler: F) {
        self.in_interrupt.store(true, Ordering::SeqCst);
        handler();
        self.in_interrupt.store(false, Ordering::SeqCst);

        if self.deferred.swap(false, Ordering::SeqCst) {
            self.pend_switch(kernel);
        }
    }

    /// Drive a started kernel from the idle context until `done` holds
    pub fn run_idle(&self, kernel: &'static Kernel<Self>, done: impl Fn() -> bool) {
        self.run_idle_with(kernel, done, || {});
    }

    /// Like [`run_idle`](Self::run_idle), taking interrupt `isr` before
    /// every idle tick
    pub fn run_idle_with(
        &self,
        kernel: &'static Kernel<Self>,
        done: impl Fn() -> bool,
        mut isr: impl FnMut(),
    ) {
        assert!(kernel.is_running(), "start the scheduler first");
        assert_eq!(self.running(), Context::Idle);
        self.register(Context::Idle, thread::current());

        let deadline = Instant::now() + TIMEOUT;
        while !done() {
            assert!(Instant::now() < deadline, "hosted scenario timed out");
            self.interrupt(kernel, &mut isr);
            self.interrupt(kernel, || kernel.tick());
        }
    }
}

impl Port for HostedPort {
    fn init_stack(
        &self,
        kernel: &'static Kernel<Self>,
        stack: &mut [u32],
        entry: ThreadFn,
        id: ThreadId,
    ) -> usize {
        let handle = thread::Builder::new()
            .name(format!("rtos-thread-{}", id.as_u32()))
            .spawn(move || {
                kernel.port().wait_for_turn(Context::Thread(id));
                entry();
                kernel.kill_current();
            })
            .expect("failed to spawn hosted thread");

        // Registered before the kernel can pick the thread
        self.register(Context::Thread(id), handle.thread().clone());
        stack.len()
    }

    fn pend_switch(&self, kernel: &Kernel<Self>) {
        if self.in_interrupt.load(Ordering::SeqCst) {
            self.deferred.store(true, Ordering::SeqCst);
            return;
        }

        let me = self.running();
        let next = match kernel.switch_context(core::ptr::null_mut()).thread {
            Some(id) => Context::Thread(id),
            None => Context::Idle,
        };

        if next != me {
            self.hand_over(next);
            self.wait_for_turn(me);
        }
    }

    fn start_first(&self, _kernel: &'static Kernel<Self>) -> ! {
        panic!("hosted kernels are driven with run_idle");
    }

    fn in_isr(&self) -> bool {
        self.in_interrupt.load(Ordering::SeqCst)
    }
}
