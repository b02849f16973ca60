//! Polled USART0 transmitter backing the debug console.

use crate::config::{CPU_FREQ_HZ, UART_BAUD};
use crate::logger::LogSink;
use avr_device::atmega328p::USART0;
use core::convert::Infallible;

const UDRE0: u8 = 0x20;
const TXC0: u8 = 0x40;
const U2X0: u8 = 0x02;
const TXEN0: u8 = 0x08;
// Asynchronous, 8N1
const UCSZ_8N1: u8 = 0x06;

// Double speed keeps the 115200 error around 2% at 16MHz
const UBRR: u16 = ((CPU_FREQ_HZ + 4 * UART_BAUD) / (8 * UART_BAUD) - 1) as u16;

pub struct SerialConsole {
    // A byte went out since the last flush
    pending: bool,
}

impl SerialConsole {
    pub fn new() -> Self {
        unsafe {
            let p = USART0::ptr();
            (*p).ubrr0.write(|w| w.bits(UBRR));
            (*p).ucsr0a.write(|w| w.bits(U2X0));
            (*p).ucsr0c.write(|w| w.bits(UCSZ_8N1));
            (*p).ucsr0b.write(|w| w.bits(TXEN0));
        }
        Self { pending: false }
    }

    pub fn write_byte(&mut self, byte: u8) {
        unsafe {
            let p = USART0::ptr();
            while (*p).ucsr0a.read().bits() & UDRE0 == 0 {}
            // Clear TXC0 by writing one, keep U2X0
            (*p).ucsr0a.write(|w| w.bits(TXC0 | U2X0));
            (*p).udr0.write(|w| w.bits(byte));
        }
        self.pending = true;
    }
}

impl Default for SerialConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl ufmt::uWrite for SerialConsole {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}

impl LogSink for SerialConsole {
    fn flush(&mut self) {
        if !self.pending {
            return;
        }
        unsafe {
            let p = USART0::ptr();
            while (*p).ucsr0a.read().bits() & TXC0 == 0 {}
        }
        self.pending = false;
    }
}
