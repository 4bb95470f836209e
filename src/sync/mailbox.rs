//! Single-slot mailbox
//!
//! The degenerate FIFO: one shared cell, a binary semaphore for "empty",
//! one for "full" and one guarding the cell.

use crate::core::cs_cell::CsCell;
use crate::critical::critical_section;
use crate::error::OsResult;
use crate::kernel::Kernel;
use crate::port::Port;
use crate::sync::sem::Semaphore;

pub struct Mailbox<T: Copy> {
    cell: CsCell<Option<T>>,
    empty: Semaphore,
    full: Semaphore,
    lock: Semaphore,
}

impl<T: Copy> Mailbox<T> {
    pub const fn new() -> Self {
        Mailbox {
            cell: CsCell::new(None),
            empty: Semaphore::new(1),
            full: Semaphore::new(0),
            lock: Semaphore::new(1),
        }
    }

    /// Empty the mailbox. No thread may be blocked on it.
    pub fn init(&self) {
        critical_section(|cs| *self.cell.get(cs) = None);
        self.empty.init(1);
        self.full.init(0);
        self.lock.init(1);
    }

    /// Deliver `data`, blocking until the previous value was received
    pub fn send<P: Port>(&self, kernel: &Kernel<P>, data: T) -> OsResult<()> {
        kernel.bwait(&self.empty)?;
        kernel.bwait(&self.lock)?;
        critical_section(|cs| *self.cell.get(cs) = Some(data));
        kernel.bsignal(&self.lock);
        kernel.bsignal(&self.full);
        Ok(())
    }

    /// Take the value, blocking until one is present
    pub fn recv<P: Port>(&self, kernel: &Kernel<P>) -> OsResult<T> {
        loop {
            kernel.bwait(&self.full)?;
            kernel.bwait(&self.lock)?;
            let data = critical_section(|cs| self.cell.get(cs).take());
            kernel.bsignal(&self.lock);

            if let Some(data) = data {
                kernel.bsignal(&self.empty);
                return Ok(data);
            }
        }
    }

    /// A value is waiting to be received
    pub fn is_full(&self) -> bool {
        critical_section(|cs| self.cell.get(cs).is_some())
    }
}

impl<T: Copy> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
