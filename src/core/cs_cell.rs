//! Critical section protected cell
//!
//! Kernel state shared between threads and interrupt handlers lives in a
//! `CsCell`; the only safe way in is through a live [`CriticalSection`].

use core::cell::UnsafeCell;
use crate::critical::CriticalSection;

/// A cell that can only be accessed within a critical section.
pub struct CsCell<T>(UnsafeCell<T>);

// SAFETY: single-core target; access is serialized by masking interrupts.
unsafe impl<T> Sync for CsCell<T> {}

impl<T> CsCell<T> {
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }

    /// Borrow the inner value for the lifetime of the guard.
    ///
    /// Callers take one borrow per critical section.
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    pub fn get<'a>(&'a self, _cs: &'a CriticalSection) -> &'a mut T {
        unsafe { &mut *self.0.get() }
    }
}
