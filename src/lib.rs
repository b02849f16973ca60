//! Deep sleep for battery powered ATmega328P nodes.
//!
//! The node powers down in watchdog-timed steps and wakes either when the
//! requested time has passed or when one of the external interrupt lines
//! fires. A few diagnostics (supply voltage, clock frequency, free RAM) are
//! provided alongside for status reports.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(
    target_arch = "avr",
    feature(asm_experimental_arch, abi_avr_interrupt)
)]

pub mod config;
pub mod diagnostics;
pub mod hal;
pub mod logger;
pub mod sleep;

#[cfg(test)]
mod testing;

pub use diagnostics::Report;
pub use hal::{Line, TriggerMode, WatchdogTimeout};
pub use logger::{LogSink, NullSink};
pub use sleep::{WakeSource, Wakeup};
