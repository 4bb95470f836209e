//! Panic handlers and default fault handler for the target build

// With defmt, RTT carries the log and panic-probe reports the panic
#[cfg(all(feature = "defmt", target_arch = "arm"))]
use defmt_rtt as _;

#[cfg(all(feature = "defmt", target_arch = "arm"))]
use panic_probe as _;

#[cfg(all(feature = "defmt", target_arch = "arm"))]
#[defmt::panic_handler]
fn defmt_panic() -> ! {
    cortex_m::asm::udf()
}

// Without defmt a panic simply parks the core
#[cfg(all(not(feature = "defmt"), target_arch = "arm"))]
use panic_halt as _;

// A fault means a thread's saved context is unusable; treat it like a kernel trap
#[cfg(target_arch = "arm")]
#[cortex_m_rt::exception]
unsafe fn HardFault(_ef: &cortex_m_rt::ExceptionFrame) -> ! {
    crate::error!("hard fault");
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::nop();
    }
}

#[cfg(all(feature = "defmt", target_arch = "arm"))]
defmt::timestamp!("{=u32}", crate::os::KERNEL.ms_time());
