//! Critical section handling
//!
//! Every mutation of the run-list, the TCB pool or a semaphore's wait queue
//! happens while a [`CriticalSection`] guard is alive. With the `stats`
//! feature every guard also feeds the interrupt-masking statistics.

use critical_section::RestoreState;

/// RAII guard for critical sections
///
/// Creating the guard masks interrupts; dropping it restores the mask
/// state that was in effect before, so guards nest freely.
pub struct CriticalSection {
    restore: RestoreState,
}

impl CriticalSection {
    /// Enter a critical section by masking interrupts.
    #[inline(always)]
    pub fn enter() -> Self {
        // SAFETY: the matching release happens exactly once, in `Drop`.
        let restore = unsafe { critical_section::acquire() };
        let cs = CriticalSection { restore };
        #[cfg(feature = "stats")]
        crate::core::stats::on_enter(&cs);
        cs
    }
}

impl Drop for CriticalSection {
    #[inline(always)]
    fn drop(&mut self) {
        #[cfg(feature = "stats")]
        crate::core::stats::on_exit(self);
        // SAFETY: `restore` came from the `acquire` in `enter`, and guards are
        // dropped in reverse order of creation.
        unsafe { critical_section::release(self.restore) };
    }
}

/// Execute a closure with interrupts masked
///
/// The closure receives the guard, which unlocks [`CsCell`] protected data.
///
/// [`CsCell`]: crate::core::cs_cell::CsCell
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    let cs = CriticalSection::enter();
    f(&cs)
}

/// Check if currently executing in an ISR context
#[inline]
pub fn is_isr_context() -> bool {
    #[cfg(target_arch = "arm")]
    {
        let ipsr: u32;
        unsafe {
            core::arch::asm!(
                "mrs {}, IPSR",
                out(reg) ipsr,
                options(nomem, nostack, preserves_flags)
            );
        }
        ipsr != 0
    }

    #[cfg(not(target_arch = "arm"))]
    {
        false
    }
}
