pub mod adc;
pub mod exint;
pub mod memory;
pub mod power;
pub mod timer;
pub mod watchdog;

#[cfg(target_arch = "avr")]
pub mod uart;

// Re-export commonly used types
pub use adc::AdcControl;
pub use exint::{ExternalInterrupts, Line, TriggerMode};
pub use memory::MemoryLayout;
pub use power::{PowerControl, SleepMode};
pub use timer::{FreeRunningCounter, Prescaler};
pub use watchdog::{WatchdogControl, WatchdogTimeout};

#[cfg(target_arch = "avr")]
pub use avr::{Mcu, WAKE_LATCH};
#[cfg(target_arch = "avr")]
pub use timer::Delay;
#[cfg(target_arch = "avr")]
pub use uart::SerialConsole;

/// Everything one sleep cycle touches.
pub trait SleepHardware: WatchdogControl + PowerControl + AdcControl + ExternalInterrupts {}

impl<T> SleepHardware for T where T: WatchdogControl + PowerControl + AdcControl + ExternalInterrupts {}

#[cfg(target_arch = "avr")]
mod avr {
    use crate::sleep::InterruptLatch;
    use avr_device::atmega328p::Peripherals;

    /// Latch shared with the INT0/INT1 vectors.
    pub static WAKE_LATCH: InterruptLatch = InterruptLatch::new();

    /// The ATmega328P register blocks the sleep core drives.
    ///
    /// Zero-sized: every access goes through the peripheral pointers, the
    /// same way the interrupt vectors reach them.
    pub struct Mcu {
        _private: (),
    }

    impl Mcu {
        /// Takes ownership of the peripherals so nothing else configures
        /// the watchdog, ADC or interrupt lines behind our back.
        pub fn new(_dp: Peripherals) -> Self {
            Self { _private: () }
        }

        /// # Safety
        ///
        /// Only for interrupt vectors, which run while the owner is halted.
        pub unsafe fn steal() -> Self {
            Self { _private: () }
        }
    }
}
