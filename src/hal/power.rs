//! Sleep mode selection and the CPU-level power-down primitives.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SleepMode {
    Idle = 0,
    AdcNoiseReduction = 1,
    PowerDown = 2,
    PowerSave = 3,
    Standby = 6,
    ExtendedStandby = 7,
}

/// CPU sleep control and global interrupt masking.
pub trait PowerControl {
    /// Whether brown-out detection can be switched off for the duration of
    /// a sleep.
    const SUPPORTS_BOD_DISABLE: bool = false;

    fn set_sleep_mode(&mut self, mode: SleepMode);

    fn enable_sleep(&mut self);

    /// Clearing the sleep-enable bit turns a following sleep instruction into
    /// a no-op. Wake handlers rely on this.
    fn disable_sleep(&mut self);

    fn disable_interrupts(&mut self);

    fn enable_interrupts(&mut self);

    /// Enables interrupts and executes the sleep instruction with nothing in
    /// between. The instruction after `sei` is always executed before any
    /// pending interrupt, so a wake-up arriving here cannot be lost.
    fn enable_interrupts_and_sleep(&mut self);

    /// Like `enable_interrupts_and_sleep`, with brown-out detection switched
    /// off for the sleep. Only called when `SUPPORTS_BOD_DISABLE` is set.
    fn disable_brown_out_and_sleep(&mut self) {
        self.enable_interrupts_and_sleep();
    }
}

#[cfg(target_arch = "avr")]
mod avr {
    use super::{PowerControl, SleepMode};
    use crate::hal::Mcu;
    use avr_device::atmega328p::CPU;

    const SE: u8 = 0x01;
    const SM_MASK: u8 = 0x0E;
    const BODS: u8 = 0x40;
    const BODSE: u8 = 0x20;
    // MCUCR in I/O space (0x55 in data space)
    const MCUCR_IO: u8 = 0x35;

    impl PowerControl for Mcu {
        const SUPPORTS_BOD_DISABLE: bool = true;

        #[inline]
        fn set_sleep_mode(&mut self, mode: SleepMode) {
            unsafe {
                let p = CPU::ptr();
                (*p).smcr.modify(|r, w| {
                    w.bits((r.bits() & !SM_MASK) | ((mode as u8) << 1))
                });
            }
        }

        #[inline]
        fn enable_sleep(&mut self) {
            unsafe {
                let p = CPU::ptr();
                (*p).smcr.modify(|r, w| w.bits(r.bits() | SE));
            }
        }

        #[inline]
        fn disable_sleep(&mut self) {
            unsafe {
                let p = CPU::ptr();
                (*p).smcr.modify(|r, w| w.bits(r.bits() & !SE));
            }
        }

        #[inline(always)]
        fn disable_interrupts(&mut self) {
            avr_device::interrupt::disable();
        }

        #[inline(always)]
        fn enable_interrupts(&mut self) {
            unsafe { avr_device::interrupt::enable() };
        }

        #[inline(always)]
        fn enable_interrupts_and_sleep(&mut self) {
            unsafe { core::arch::asm!("sei", "sleep") };
        }

        // BODS only holds for three cycles after the timed write, so the
        // write, `sei` and `sleep` share one block.
        #[inline(always)]
        fn disable_brown_out_and_sleep(&mut self) {
            unsafe {
                core::arch::asm!(
                    "in {tmp}, {mcucr}",
                    "ori {tmp}, {both}",
                    "out {mcucr}, {tmp}",
                    "andi {tmp}, {keep}",
                    "out {mcucr}, {tmp}",
                    "sei",
                    "sleep",
                    tmp = out(reg_upper) _,
                    mcucr = const MCUCR_IO,
                    both = const BODS | BODSE,
                    keep = const !BODSE,
                )
            };
        }
    }
}
