//! Watchdog timer used as the wake-up clock during power-down.

use core::convert::Infallible;

/// Hardware watchdog periods, encoded as WDP[3:0].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WatchdogTimeout {
    Ms16 = 0,
    Ms32 = 1,
    Ms64 = 2,
    Ms125 = 3,
    Ms250 = 4,
    Ms500 = 5,
    Ms1000 = 6,
    Ms2000 = 7,
    Ms4000 = 8,
    Ms8000 = 9,
}

impl WatchdogTimeout {
    /// Nominal period at 5V.
    pub const fn period_ms(self) -> u32 {
        match self {
            Self::Ms16 => 16,
            Self::Ms32 => 32,
            Self::Ms64 => 64,
            Self::Ms125 => 125,
            Self::Ms250 => 250,
            Self::Ms500 => 500,
            Self::Ms1000 => 1000,
            Self::Ms2000 => 2000,
            Self::Ms4000 => 4000,
            Self::Ms8000 => 8000,
        }
    }

    /// Prescaler bits as laid out in WDTCSR (WDP3 sits apart at bit 5).
    #[inline]
    pub const fn prescaler_bits(self) -> u8 {
        let v = self as u8;
        (v & 0x07) | ((v & 0x08) << 2)
    }
}

/// Control over the watchdog as a wake-up source.
///
/// Every method is infallible; a bad configuration is a programming error.
pub trait WatchdogControl {
    /// Snapshot of the caller's watchdog configuration.
    type Settings: Copy;

    fn watchdog_settings(&self) -> Self::Settings;

    /// Puts a snapshot back, clearing any interrupt flag left by a timeout.
    fn restore_watchdog(&mut self, settings: Self::Settings);

    /// Starts the watchdog for `timeout` in interrupt mode. Expiry only
    /// resumes execution, it never resets the device.
    fn arm_watchdog(&mut self, timeout: WatchdogTimeout);

    /// Stops the watchdog entirely.
    fn disable_watchdog(&mut self);

    /// Restarts a pending countdown.
    fn reset_watchdog(&mut self);

    /// `Ok` once the armed period has expired.
    fn poll_watchdog(&mut self) -> nb::Result<(), Infallible>;
}

#[cfg(target_arch = "avr")]
mod avr {
    use super::{WatchdogControl, WatchdogTimeout};
    use crate::hal::Mcu;
    use avr_device::atmega328p::{CPU, WDT};
    use avr_device::interrupt;
    use core::convert::Infallible;

    const WDIF: u8 = 0x80;
    const WDIE: u8 = 0x40;
    const WDCE: u8 = 0x10;
    const WDE: u8 = 0x08;
    const WDRF: u8 = 0x08;

    /// Timed sequence: WDE/prescaler changes must land within four cycles
    /// of setting WDCE.
    fn write_timed(value: u8) {
        interrupt::free(|_| unsafe {
            let cpu = CPU::ptr();
            let wdt = WDT::ptr();
            avr_device::asm::wdr();
            (*cpu).mcusr.modify(|r, w| w.bits(r.bits() & !WDRF));
            (*wdt).wdtcsr.modify(|r, w| w.bits(r.bits() | WDCE | WDE));
            (*wdt).wdtcsr.write(|w| w.bits(value));
        });
    }

    impl WatchdogControl for Mcu {
        type Settings = u8;

        fn watchdog_settings(&self) -> u8 {
            unsafe { (*WDT::ptr()).wdtcsr.read().bits() }
        }

        fn restore_watchdog(&mut self, settings: u8) {
            write_timed((settings & !WDCE) | WDIF);
        }

        fn arm_watchdog(&mut self, timeout: WatchdogTimeout) {
            write_timed(WDIF | WDIE | timeout.prescaler_bits());
        }

        fn disable_watchdog(&mut self) {
            write_timed(WDIF);
        }

        #[inline]
        fn reset_watchdog(&mut self) {
            avr_device::asm::wdr();
        }

        fn poll_watchdog(&mut self) -> nb::Result<(), Infallible> {
            let flags = unsafe { (*WDT::ptr()).wdtcsr.read().bits() };
            if flags & WDIF != 0 {
                Ok(())
            } else {
                Err(nb::Error::WouldBlock)
            }
        }
    }

    // Only resumes execution after power-down; WDIE is cleared by hardware.
    #[avr_device::interrupt(atmega328p)]
    fn WDT() {}
}
