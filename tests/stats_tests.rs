//! Interrupt-masking statistics
//!
//! The meter is global to the CPU, so these tests own the whole binary
//! and run one at a time against a hand-driven clock.

#[cfg(test)]
mod ints_tests {
    use core::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    use rtos::critical::critical_section;
    use rtos::stats;
    use rtos::IntsDisabled;

    static SERIAL: Mutex<()> = Mutex::new(());
    static NOW: AtomicU32 = AtomicU32::new(0);

    fn clock() -> u32 {
        NOW.load(Ordering::SeqCst)
    }

    fn advance(by: u32) {
        NOW.fetch_add(by, Ordering::SeqCst);
    }

    fn serial() -> MutexGuard<'static, ()> {
        SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[test]
    fn test_outermost_section_is_timed() {
        let _serial = serial();
        NOW.store(1_000, Ordering::SeqCst);
        stats::set_clock(clock);

        critical_section(|_| advance(100));
        critical_section(|_| {
            advance(40);
            // Counted as part of the outer section only
            critical_section(|_| advance(10));
        });
        advance(1_350);

        assert_eq!(
            stats::ints_disabled(),
            IntsDisabled { max: 100, total: 150, percent: 10 }
        );
    }

    #[test]
    fn test_clear_starts_a_new_window() {
        let _serial = serial();
        NOW.store(0, Ordering::SeqCst);
        stats::set_clock(clock);

        critical_section(|_| advance(500));
        stats::clear();
        assert_eq!(stats::ints_disabled(), IntsDisabled::default());

        critical_section(|_| advance(20));
        advance(180);
        assert_eq!(
            stats::ints_disabled(),
            IntsDisabled { max: 20, total: 20, percent: 10 }
        );
    }

    #[test]
    fn test_clock_across_wraparound() {
        let _serial = serial();
        NOW.store(u32::MAX - 10, Ordering::SeqCst);
        stats::set_clock(clock);

        critical_section(|_| advance(30));
        advance(70);

        let ints = stats::ints_disabled();
        assert_eq!(ints.max, 30);
        assert_eq!(ints.percent, 30);
    }
}
