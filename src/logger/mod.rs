//! Debug output sink.
//!
//! The sleep core only needs to print short lines and to drain buffered
//! output before the clock stops; transport setup and formatting policy
//! belong to the application.

use core::convert::Infallible;
use ufmt::uWrite;

/// A `ufmt` writer that can be drained.
pub trait LogSink: uWrite {
    /// Blocks until everything written so far has left the device.
    fn flush(&mut self);
}

/// Discards all output.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl uWrite for NullSink {
    type Error = Infallible;

    fn write_str(&mut self, _s: &str) -> Result<(), Infallible> {
        Ok(())
    }
}

impl LogSink for NullSink {
    fn flush(&mut self) {}
}
