//! Timer/counters: a free-running reference counter and a busy-wait delay.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prescaler {
    Stop = 0,
    Direct = 1,
    Div8 = 2,
    Div64 = 3,
    Div256 = 4,
    Div1024 = 5,
}

/// A 16-bit counter clocked from the CPU clock.
pub trait FreeRunningCounter {
    /// Control register snapshot.
    type Settings: Copy;

    fn counter_settings(&self) -> Self::Settings;

    fn restore_counter(&mut self, settings: Self::Settings);

    /// Stops the counter, clears its flags and count, selects normal mode.
    fn clear_counter(&mut self);

    fn start_counter(&mut self, prescaler: Prescaler);

    fn stop_counter(&mut self);

    fn count(&self) -> u16;
}

#[cfg(target_arch = "avr")]
pub use avr::Delay;

#[cfg(target_arch = "avr")]
mod avr {
    use super::{FreeRunningCounter, Prescaler};
    use crate::config::CPU_FREQ_HZ;
    use crate::hal::Mcu;
    use avr_device::atmega328p::{TC0, TC1};
    use embedded_hal::blocking::delay::DelayMs;

    const CS_MASK: u8 = 0x07;

    impl FreeRunningCounter for Mcu {
        type Settings = [u8; 3];

        fn counter_settings(&self) -> [u8; 3] {
            unsafe {
                let p = TC1::ptr();
                [
                    (*p).tccr1a.read().bits(),
                    (*p).tccr1b.read().bits(),
                    (*p).tccr1c.read().bits(),
                ]
            }
        }

        fn restore_counter(&mut self, settings: [u8; 3]) {
            unsafe {
                let p = TC1::ptr();
                (*p).tccr1a.write(|w| w.bits(settings[0]));
                (*p).tccr1c.write(|w| w.bits(settings[2]));
                (*p).tccr1b.write(|w| w.bits(settings[1]));
            }
        }

        fn clear_counter(&mut self) {
            unsafe {
                let p = TC1::ptr();
                (*p).tccr1b.write(|w| w.bits(0));
                (*p).tifr1.write(|w| w.bits(0xFF));
                (*p).tcnt1.write(|w| w.bits(0));
                (*p).tccr1a.write(|w| w.bits(0));
                (*p).tccr1c.write(|w| w.bits(0));
            }
        }

        fn start_counter(&mut self, prescaler: Prescaler) {
            unsafe {
                let p = TC1::ptr();
                (*p).tccr1b.modify(|r, w| {
                    w.bits((r.bits() & !CS_MASK) | (prescaler as u8 & CS_MASK))
                });
            }
        }

        fn stop_counter(&mut self) {
            unsafe {
                let p = TC1::ptr();
                (*p).tccr1b.modify(|r, w| w.bits(r.bits() & !CS_MASK));
            }
        }

        fn count(&self) -> u16 {
            unsafe { (*TC1::ptr()).tcnt1.read().bits() }
        }
    }

    // Timer0 at /64
    const TICKS_PER_MS: u32 = CPU_FREQ_HZ / 64 / 1000;
    const _: () = assert!(TICKS_PER_MS > 0 && TICKS_PER_MS <= 255);

    /// Millisecond busy-wait on Timer0.
    pub struct Delay {
        _private: (),
    }

    impl Delay {
        pub fn new() -> Self {
            Self { _private: () }
        }
    }

    impl Default for Delay {
        fn default() -> Self {
            Self::new()
        }
    }

    impl DelayMs<u16> for Delay {
        fn delay_ms(&mut self, ms: u16) {
            unsafe {
                let p = TC0::ptr();
                (*p).tccr0a.write(|w| w.bits(0));
                (*p).tcnt0.write(|w| w.bits(0));
                (*p).tccr0b.write(|w| w.bits(Prescaler::Div64 as u8));

                for _ in 0..ms {
                    while u32::from((*p).tcnt0.read().bits()) < TICKS_PER_MS {}
                    (*p).tcnt0.write(|w| w.bits(0));
                }

                (*p).tccr0b.write(|w| w.bits(Prescaler::Stop as u8));
            }
        }
    }
}
