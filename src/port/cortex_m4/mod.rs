//! Cortex-M4 port implementation
//!
//! SysTick is the kernel tick. Context switches happen in PendSV at the
//! lowest exception priority: R4-R11 and EXC_RETURN are pushed on the
//! outgoing process stack, the kernel picks the next context, and the
//! same registers are popped from the incoming one. Threads and the idle
//! context all run in thread mode on PSP.

use core::arch::naked_asm;

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};

use crate::config::CFG_TICK_PERIOD;
use crate::critical::is_isr_context;
use crate::kernel::Kernel;
use crate::port::{Port, TickPhase};
use crate::types::{OsStkElement, ThreadFn, ThreadId};

/// Lowest priority on a part with 4 priority bits
const PRIO_LOWEST: u8 = 0xF0;

/// Thread mode, process stack, no FP context
const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

/// Thumb state bit
const XPSR_T: u32 = 0x0100_0000;

/// Cortex-M4 port
pub struct CortexM4;

impl CortexM4 {
    pub const fn new() -> Self {
        CortexM4
    }
}

impl Default for CortexM4 {
    fn default() -> Self {
        Self::new()
    }
}

/// Initial context image, lowest address first
///
/// The software-saved part (R4-R11, EXC_RETURN) sits below the frame the
/// hardware unstacks on exception return.
#[repr(C)]
struct UcStk {
    r4: u32,
    r5: u32,
    r6: u32,
    r7: u32,
    r8: u32,
    r9: u32,
    r10: u32,
    r11: u32,
    exc_return: u32,
    r0: u32,
    r1: u32,
    r2: u32,
    r3: u32,
    r12: u32,
    lr: u32,
    pc: u32,
    xpsr: u32,
}
const CONTEXT_STACK_SIZE: usize = 17;

impl UcStk {
    fn new(pc: u32, lr: u32, r0: u32) -> Self {
        UcStk {
            r4: 0x04040404,
            r5: 0x05050505,
            r6: 0x06060606,
            r7: 0x07070707,
            r8: 0x08080808,
            r9: 0x09090909,
            r10: 0x10101010,
            r11: 0x11111111,
            exc_return: EXC_RETURN_THREAD_PSP,
            r0,
            r1: 0,
            r2: 0,
            r3: 0,
            r12: 0,
            lr,
            pc: pc | 1,
            xpsr: XPSR_T,
        }
    }

    fn words(&self) -> [u32; CONTEXT_STACK_SIZE] {
        [
            self.r4, self.r5, self.r6, self.r7, self.r8, self.r9, self.r10, self.r11,
            self.exc_return, self.r0, self.r1, self.r2, self.r3, self.r12, self.lr,
            self.pc, self.xpsr,
        ]
    }

    /// Place the image at the 8-byte aligned top of `stack`; returns its
    /// word offset
    fn write_to(&self, stack: &mut [OsStkElement]) -> usize {
        let end = stack.as_ptr() as usize + core::mem::size_of_val(stack);
        let top = stack.len() - (end % 8) / core::mem::size_of::<OsStkElement>();
        let frame = top - CONTEXT_STACK_SIZE;
        stack[frame..top].copy_from_slice(&self.words());
        frame
    }
}

impl Port for CortexM4 {
    fn init_stack(
        &self,
        _kernel: &'static Kernel<Self>,
        stack: &mut [OsStkElement],
        entry: ThreadFn,
        id: ThreadId,
    ) -> usize {
        let frame = UcStk::new(entry as usize as u32, thread_exit as usize as u32, id.as_u32());
        frame.write_to(stack)
    }

    fn init_idle_stack(&self, stack: &mut [OsStkElement]) -> usize {
        let frame = UcStk::new(idle_loop as usize as u32, idle_loop as usize as u32, 0);
        frame.write_to(stack)
    }

    #[inline(always)]
    fn pend_switch(&self, _kernel: &Kernel<Self>) {
        SCB::set_pendsv();
    }

    fn start_first(&self, _kernel: &'static Kernel<Self>) -> ! {
        unsafe {
            let mut p = cortex_m::Peripherals::steal();

            // PendSV and SysTick never preempt each other or a device ISR
            p.SCB.set_priority(SystemHandler::PendSV, PRIO_LOWEST);
            p.SCB.set_priority(SystemHandler::SysTick, PRIO_LOWEST);

            p.SYST.set_reload(CFG_TICK_PERIOD - 1);
            p.SYST.clear_current();
            p.SYST.set_clock_source(SystClkSource::Core);
            p.SYST.enable_interrupt();
            p.SYST.enable_counter();

            // PSP == 0 tells PendSV there is no outgoing context to save
            cortex_m::register::psp::write(0);

            SCB::set_pendsv();
            cortex_m::interrupt::enable();
        }

        loop {
            cortex_m::asm::wfi();
        }
    }

    #[inline(always)]
    fn in_isr(&self) -> bool {
        is_isr_context()
    }

    /// Called with interrupts masked, so a pending flag stays set
    fn tick_phase(&self) -> TickPhase {
        TickPhase::sample(SYST::get_reload(), SYST::get_current, SCB::is_pendst_pending)
    }

    #[inline(always)]
    fn wait_for_interrupt(&self) {
        cortex_m::asm::wfi();
    }
}

/// Called from PendSV with the outgoing PSP. Returns it if R4-R11/LR
/// should be pushed there, null if the outgoing context is gone (first
/// dispatch, killed thread).
extern "C" fn pendsv_outgoing(psp: *mut OsStkElement) -> *mut OsStkElement {
    if !psp.is_null() && crate::os::KERNEL.saves_outgoing() {
        psp
    } else {
        core::ptr::null_mut()
    }
}

/// Called from PendSV with the outgoing PSP after R4-R11/LR were pushed
/// (null if nothing was saved). Returns the PSP to restore from.
extern "C" fn pendsv_switch_context(saved_sp: *mut OsStkElement) -> *mut OsStkElement {
    crate::os::KERNEL.switch_context(saved_sp).sp
}

/// PendSV exception handler - performs full context switch
///
/// 1. Ask the kernel whether the outgoing context is worth saving
/// 2. Save R4-R11, LR to its PSP (skipped for a dead or missing context)
/// 3. Let the kernel choose the next context
/// 4. Restore R4-R11, LR from the new context's stack
/// 5. Exception return
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        "cpsid i",
        "mrs r0, psp",
        // EXC_RETURN survives the call on the main stack; r3 keeps it 8-byte aligned
        "push {{r3, lr}}",
        "bl {outgoing}",
        "pop {{r3, lr}}",
        "cbz r0, 1f",
        "stmdb r0!, {{r4-r11, lr}}",
        "1:",
        "bl {switch}",
        "ldmia r0!, {{r4-r11, lr}}",
        "msr psp, r0",
        "cpsie i",
        "isb",
        "bx lr",
        outgoing = sym pendsv_outgoing,
        switch = sym pendsv_switch_context,
    );
}

/// SysTick interrupt handler
#[no_mangle]
pub extern "C" fn SysTick() {
    crate::os::KERNEL.tick();
}

/// Return address of every thread entry
extern "C" fn thread_exit() -> ! {
    crate::os::KERNEL.kill_current()
}

/// Body of the idle context
extern "C" fn idle_loop() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}
