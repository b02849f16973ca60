//! A single power-down step.

use crate::hal::{SleepHardware, SleepMode, WatchdogTimeout};
use crate::sleep::SleepCycleContext;

/// How long one power-down may last.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SleepPeriod {
    /// Wake on the watchdog after this period, or earlier on an interrupt.
    Timeout(WatchdogTimeout),
    /// Watchdog off; only an external interrupt ends the cycle.
    Forever,
}

/// Owns the hardware and runs power-down cycles on it.
pub struct SleepController<H> {
    hw: H,
}

impl<H: SleepHardware> SleepController<H> {
    pub fn new(hw: H) -> Self {
        Self { hw }
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn free(self) -> H {
        self.hw
    }

    /// Powers down until the watchdog or an attached line fires.
    ///
    /// The watchdog configuration is saved before and restored after, and the
    /// ADC is switched back on, so nothing is left half-configured whichever
    /// source ends the cycle.
    pub fn enter_cycle(&mut self, ctx: &mut SleepCycleContext<'_>, period: SleepPeriod) {
        let hw = &mut self.hw;

        hw.disable_adc();
        let saved = hw.watchdog_settings();
        match period {
            SleepPeriod::Timeout(timeout) => hw.arm_watchdog(timeout),
            SleepPeriod::Forever => hw.disable_watchdog(),
        }
        hw.set_sleep_mode(SleepMode::PowerDown);

        hw.disable_interrupts();
        // A line may have fired since the caller last looked; its handler
        // already cleared SE, so this cycle must not set it again.
        let slept = !ctx.interrupted();
        if slept {
            hw.enable_sleep();
            // `sei` and `sleep` must stay back to back: an interrupt taken
            // between them would be serviced before the CPU halts and the
            // cycle would then sleep without a pending wake-up.
            if H::SUPPORTS_BOD_DISABLE {
                hw.disable_brown_out_and_sleep();
            } else {
                hw.enable_interrupts_and_sleep();
            }
        }

        hw.disable_sleep();
        hw.restore_watchdog(saved);
        hw.enable_adc();

        if slept {
            ctx.record_cycle();
        } else {
            hw.enable_interrupts();
        }
    }
}
