//! Error types
//!
//! Setup-time failures are plain `Result` values. Conditions the kernel
//! cannot recover from go through [`os_trap`] instead.

/// RTOS error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum OsError {
    // ============ Capacity errors ============
    /// No free TCB or periodic slot
    CapacityExceeded = 10001,
    /// Event slot already holds a task
    AlreadyRegistered = 10002,

    // ============ Fatal errors ============
    /// Stack canary overwritten
    StackOverflow = 15001,
    /// The last live thread tried to exit
    NoRunnableThread = 15002,

    // ============ OS state errors ============
    /// OS not initialized
    OsNotInit = 24201,
    /// OS is already running
    OsRunning = 24202,
    /// OS is not running
    OsNotRunning = 24203,

    // ============ Argument errors ============
    /// Stack size out of range or not a multiple of 8 bytes
    StkSizeInvalid = 28208,
    /// Zero period for a periodic task
    PeriodInvalid = 29504,
    /// No periodic slot with that index
    SlotInvalid = 29505,

    // ============ Context errors ============
    /// Cannot wait on a semaphore from ISR
    PendIsr = 25006,
    /// Cannot sleep from ISR
    SleepIsr = 29301,
    /// Cannot kill from ISR
    KillIsr = 29006,
    /// Operation needs a running thread, but the CPU is idle
    NotThreadContext = 29007,
    /// The current thread already left the run-list
    ThreadNotRunning = 29016,
}

/// Result type alias for RTOS operations
pub type OsResult<T> = Result<T, OsError>;

impl OsError {
    /// Errors after which the scheduler state cannot be trusted
    #[inline]
    pub fn is_fatal(self) -> bool {
        matches!(self, OsError::StackOverflow | OsError::NoRunnableThread)
    }

    /// Numeric code, stable across releases
    #[inline]
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Halt the system on an unrecoverable kernel condition
///
/// Never returns: on the target interrupts stay masked and the core spins,
/// on a host the calling thread panics.
#[cold]
pub fn os_trap(err: OsError) -> ! {
    crate::error!("kernel trap: {}", err);

    #[cfg(target_arch = "arm")]
    {
        cortex_m::interrupt::disable();
        loop {
            cortex_m::asm::nop();
        }
    }

    #[cfg(not(target_arch = "arm"))]
    {
        panic!("kernel trap: {:?}", err)
    }
}
