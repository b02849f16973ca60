//! Deep sleep with wake-on-timer and wake-on-interrupt.

pub mod controller;
pub mod latch;
pub mod scheduler;
pub mod wakeup;

pub use controller::{SleepController, SleepPeriod};
pub use latch::{InterruptLatch, Slot};
pub use scheduler::{sleep_for_duration, Decomposition, TimeoutBucket, MIN_SLEEP_MS, TIMEOUT_BUCKETS};
pub use wakeup::{WakeSource, Wakeup};

/// State of the one sleep call in progress.
///
/// Created by `Wakeup` for the length of a call and lent to the scheduler and
/// controller; only one exists at a time.
pub struct SleepCycleContext<'a> {
    latch: &'a InterruptLatch,
    cycles: u32,
}

impl<'a> SleepCycleContext<'a> {
    pub fn new(latch: &'a InterruptLatch) -> Self {
        Self { latch, cycles: 0 }
    }

    #[inline]
    pub fn interrupted(&self) -> bool {
        self.latch.interrupted()
    }

    /// Power-down cycles entered so far.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub(crate) fn record_cycle(&mut self) {
        self.cycles = self.cycles.saturating_add(1);
    }
}
