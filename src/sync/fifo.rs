//! Bounded FIFO
//!
//! A ring of `N` slots (`N` a power of two, indices wrap with a mask)
//! guarded by a "space" and a "data" semaphore. `put` never blocks, so
//! interrupt handlers can produce; `get` blocks the calling thread while
//! the FIFO is empty.

use crate::core::cs_cell::CsCell;
use crate::critical::critical_section;
use crate::error::OsResult;
use crate::kernel::Kernel;
use crate::port::Port;
use crate::sync::sem::Semaphore;

struct Ring<T: Copy, const N: usize> {
    slots: [Option<T>; N],
    put: usize,
    get: usize,
    len: usize,
}

impl<T: Copy, const N: usize> Ring<T, N> {
    const MASK: usize = {
        assert!(N.is_power_of_two(), "FIFO size must be a power of two");
        N - 1
    };

    const fn new() -> Self {
        Ring {
            slots: [None; N],
            put: 0,
            get: 0,
            len: 0,
        }
    }

    fn clear(&mut self) {
        self.slots = [None; N];
        self.put = 0;
        self.get = 0;
        self.len = 0;
    }

    fn push(&mut self, data: T) {
        self.slots[self.put] = Some(data);
        self.put = (self.put + 1) & Self::MASK;
        self.len += 1;
    }

    fn pop(&mut self) -> Option<T> {
        let data = self.slots[self.get].take()?;
        self.get = (self.get + 1) & Self::MASK;
        self.len -= 1;
        Some(data)
    }
}

/// Fixed-capacity FIFO of `T`
pub struct Fifo<T: Copy, const N: usize> {
    ring: CsCell<Ring<T, N>>,
    space: Semaphore,
    data: Semaphore,
}

impl<T: Copy, const N: usize> Fifo<T, N> {
    /// An empty FIFO using all `N` slots
    pub const fn new() -> Self {
        Fifo {
            ring: CsCell::new(Ring::new()),
            space: Semaphore::new(N as i32),
            data: Semaphore::new(0),
        }
    }

    /// Empty the FIFO and set its capacity
    ///
    /// A capacity of 0 or above `N` means `N`. Must not be called while a
    /// thread is blocked in `get`.
    pub fn init(&self, capacity: usize) {
        let capacity = if capacity == 0 || capacity > N { N } else { capacity };
        critical_section(|cs| {
            self.ring.get(cs).clear();
            self.space.init(capacity as i32);
            self.data.init(0);
        });
    }

    /// Append an element; `false` if the FIFO is full
    pub fn put<P: Port>(&self, kernel: &Kernel<P>, data: T) -> bool {
        kernel.with_sched(|cs, sched| {
            if !self.space.try_acquire(cs) {
                return false;
            }
            self.ring.get(cs).push(data);
            self.data.release(cs, sched);
            true
        })
    }

    /// Remove the oldest element, blocking while the FIFO is empty
    pub fn get<P: Port>(&self, kernel: &Kernel<P>) -> OsResult<T> {
        loop {
            kernel.wait(&self.data)?;

            let data = kernel.with_sched(|cs, sched| {
                let data = self.ring.get(cs).pop();
                if data.is_some() {
                    self.space.release(cs, sched);
                }
                data
            });

            // Only an `init` racing the wakeup leaves the ring empty here
            if let Some(data) = data {
                return Ok(data);
            }
        }
    }

    /// Number of elements currently stored
    pub fn size(&self) -> isize {
        critical_section(|cs| self.ring.get(cs).len as isize)
    }

    /// Largest capacity `init` accepts
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<T: Copy, const N: usize> Default for Fifo<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
