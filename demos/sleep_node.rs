//! Sleep node on an ATmega328P at 16MHz.
//!
//! Sleeps in a loop, waking on a button on INT0 (active low) or after ten
//! seconds, and prints the wake source and a status line each time round.

#![no_std]
#![no_main]

use panic_halt as _;

use avr_device::atmega328p::Peripherals;
use avr_sleep_core::diagnostics::{self, Report};
use avr_sleep_core::hal::{Delay, Mcu, SerialConsole, WAKE_LATCH};
use avr_sleep_core::{Line, LogSink, TriggerMode, WakeSource, Wakeup};
use ufmt::uwriteln;

const BUTTON: Line = Line(0);
const RADIO_IRQ: Line = Line(1);
const REPORT_EVERY_MS: u32 = 10_000;

#[avr_device::entry]
fn main() -> ! {
    let dp = match Peripherals::take() {
        Some(dp) => dp,
        None => loop {},
    };

    let mcu = Mcu::new(dp);
    let mut delay = Delay::new();
    let mut node = Wakeup::new(mcu, &WAKE_LATCH, SerialConsole::new());

    uwriteln!(node.log(), "node up").ok();
    if diagnostics::unique_device_id().is_none() {
        uwriteln!(node.log(), "no serial number").ok();
    }

    // Let the console settle before the first power-down.
    node.sleep_for(250);

    loop {
        let source = node.sleep_until_either(
            BUTTON,
            TriggerMode::Low,
            RADIO_IRQ,
            TriggerMode::Falling,
            REPORT_EVERY_MS,
        );

        let report = Report::collect(node.hardware_mut(), &mut delay);
        let log = node.log();
        uwriteln!(log, "code={} {}", source.code(), report).ok();
        log.flush();

        if source == WakeSource::Interrupt(BUTTON) {
            // crude debounce, the line is level triggered
            node.sleep_for(500);
        }
    }
}
