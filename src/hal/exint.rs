//! External interrupt lines (INTn) used as wake-up signals.

/// Hardware interrupt line number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line(pub u8);

impl Line {
    /// No line configured / no interrupt latched.
    pub const NONE: Line = Line(0xFF);

    /// Whether `I` has this line. `NONE` is never valid.
    #[inline]
    pub fn is_valid<I: ExternalInterrupts + ?Sized>(self) -> bool {
        self.0 < I::LINES
    }
}

/// Sense control, encoded as ISCn1:ISCn0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TriggerMode {
    Low = 0,
    Change = 1,
    Falling = 2,
    Rising = 3,
}

/// Interrupt controller for the external lines.
///
/// Bindings are never assumed to outlive one sleep cycle.
pub trait ExternalInterrupts {
    /// Number of lines; valid ids are `0..LINES`.
    const LINES: u8;

    /// Drops a stale pending flag so it cannot wake the CPU right away.
    fn clear_pending(&mut self, line: Line);

    fn attach(&mut self, line: Line, mode: TriggerMode);

    fn detach(&mut self, line: Line);
}

#[cfg(target_arch = "avr")]
mod avr {
    use super::{ExternalInterrupts, Line, TriggerMode};
    use crate::hal::{Mcu, WAKE_LATCH};
    use avr_device::atmega328p::EXINT;

    impl ExternalInterrupts for Mcu {
        const LINES: u8 = 2;

        fn clear_pending(&mut self, line: Line) {
            unsafe {
                let p = EXINT::ptr();
                // Write one to clear
                (*p).eifr.write(|w| w.bits(1 << line.0));
            }
        }

        fn attach(&mut self, line: Line, mode: TriggerMode) {
            let shift = line.0 * 2;
            unsafe {
                let p = EXINT::ptr();
                (*p).eicra.modify(|r, w| {
                    w.bits((r.bits() & !(0x03 << shift)) | ((mode as u8) << shift))
                });
                (*p).eimsk.modify(|r, w| w.bits(r.bits() | (1 << line.0)));
            }
        }

        fn detach(&mut self, line: Line) {
            unsafe {
                let p = EXINT::ptr();
                (*p).eimsk.modify(|r, w| w.bits(r.bits() & !(1 << line.0)));
            }
        }
    }

    #[avr_device::interrupt(atmega328p)]
    fn INT0() {
        let mut mcu = unsafe { Mcu::steal() };
        WAKE_LATCH.on_interrupt(Line(0), &mut mcu);
    }

    #[avr_device::interrupt(atmega328p)]
    fn INT1() {
        let mut mcu = unsafe { Mcu::steal() };
        WAKE_LATCH.on_interrupt(Line(1), &mut mcu);
    }
}
