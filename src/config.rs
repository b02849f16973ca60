//! Configuration constants for the sleep core

use crate::hal::watchdog::WatchdogTimeout;

/// CPU frequency in Hz, as exported by the build script
pub const CPU_FREQ_HZ: u32 = parse_hz(env!("MCU_FREQ_HZ"));

/// UART baud rate of the debug console
pub const UART_BAUD: u32 = 115_200;

/// 1.1V bandgap * 1023 * 1000, divided by the raw reading gives Vcc in mV
pub const VCC_SCALE_MV: u32 = 1_125_300;

/// Time the internal reference needs after switching the multiplexer
pub const VREF_SETTLE_MS: u16 = 70;

/// Watchdog period used as the reference window for frequency estimation
pub const FREQ_WINDOW: WatchdogTimeout = WatchdogTimeout::Ms500;

/// Counter prescaler (1024) times windows per second (2)
pub const FREQ_TICK_SCALE: u32 = 2048;

/// Hz per reported unit (1/10 MHz)
pub const FREQ_UNIT_HZ: u32 = 100_000;

const fn parse_hz(s: &str) -> u32 {
    let bytes = s.as_bytes();
    let mut value = 0u32;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i];
        assert!(digit.is_ascii_digit(), "MCU_FREQ_HZ must be decimal");
        value = value * 10 + (digit - b'0') as u32;
        i += 1;
    }
    value
}
