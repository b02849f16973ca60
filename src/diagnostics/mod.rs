//! Supply, clock and memory estimates for status reports.

use embedded_hal::blocking::delay::DelayMs;
use ufmt::{uDisplay, uWrite, uwrite, Formatter};

use crate::config::{FREQ_TICK_SCALE, FREQ_UNIT_HZ, FREQ_WINDOW, VCC_SCALE_MV, VREF_SETTLE_MS};
use crate::hal::{
    AdcControl, FreeRunningCounter, MemoryLayout, PowerControl, Prescaler, WatchdogControl,
};

/// Factory-programmed serial number.
pub type UniqueId = [u8; 16];

/// Estimates Vcc in millivolts by measuring the 1.1V bandgap against it.
///
/// Works from reset state: the converter is enabled and clocked for the
/// measurement, then its control and multiplexer settings are restored. A
/// zero reading, or one so low that the result does not fit, reports
/// `u16::MAX`.
pub fn supply_voltage_mv<H, D>(hw: &mut H, delay: &mut D) -> u16
where
    H: AdcControl,
    D: DelayMs<u16>,
{
    let control = hw.adc_settings();
    let mux = hw.adc_mux();
    hw.prepare_adc();
    hw.select_bandgap();
    delay.delay_ms(VREF_SETTLE_MS);

    hw.start_conversion();
    let raw = match nb::block!(hw.read_conversion()) {
        Ok(raw) => raw,
        Err(never) => match never {},
    };
    hw.set_adc_mux(mux);
    hw.restore_adc(control);

    if raw == 0 {
        return u16::MAX;
    }
    u16::try_from(VCC_SCALE_MV / u32::from(raw)).unwrap_or(u16::MAX)
}

/// Estimates the CPU clock in 1/10 MHz.
///
/// Counts system clock ticks (prescaled by 1024) across one watchdog period.
/// The watchdog oscillator is only good to about 10%, and so is the result.
/// Watchdog and counter configuration are put back as they were found.
pub fn cpu_frequency<H>(hw: &mut H) -> u16
where
    H: WatchdogControl + FreeRunningCounter + PowerControl,
{
    hw.disable_interrupts();
    let counter = hw.counter_settings();
    hw.clear_counter();

    let watchdog = hw.watchdog_settings();
    hw.arm_watchdog(FREQ_WINDOW);
    hw.reset_watchdog();

    hw.start_counter(Prescaler::Div1024);
    if let Err(never) = nb::block!(hw.poll_watchdog()) {
        match never {}
    }
    hw.stop_counter();
    let ticks = u32::from(hw.count());

    hw.reset_watchdog();
    hw.restore_watchdog(watchdog);
    hw.restore_counter(counter);
    hw.enable_interrupts();

    u16::try_from(ticks * FREQ_TICK_SCALE / FREQ_UNIT_HZ).unwrap_or(u16::MAX)
}

/// Bytes between the top of the heap and the stack pointer.
pub fn free_memory<H: MemoryLayout>(hw: &H) -> u16 {
    let gap = hw.stack_pointer().saturating_sub(hw.heap_end());
    u16::try_from(gap).unwrap_or(u16::MAX)
}

/// The ATmega328P has no readable serial number.
pub fn unique_device_id() -> Option<UniqueId> {
    None
}

/// One status line's worth of diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Report {
    pub supply_mv: u16,
    pub cpu_decimhz: u16,
    pub free_bytes: u16,
}

impl Report {
    pub fn collect<H, D>(hw: &mut H, delay: &mut D) -> Self
    where
        H: AdcControl + WatchdogControl + FreeRunningCounter + PowerControl + MemoryLayout,
        D: DelayMs<u16>,
    {
        Self {
            supply_mv: supply_voltage_mv(hw, delay),
            cpu_decimhz: cpu_frequency(hw),
            free_bytes: free_memory(&*hw),
        }
    }
}

impl uDisplay for Report {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        uwrite!(
            f,
            "vcc={}mV clk={}.{}MHz free={}B",
            self.supply_mv,
            self.cpu_decimhz / 10,
            self.cpu_decimhz % 10,
            self.free_bytes
        )
    }
}
