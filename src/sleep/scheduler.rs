//! Splits a requested sleep into watchdog-sized power-down cycles.

use crate::hal::{SleepHardware, WatchdogTimeout};
use crate::sleep::controller::{SleepController, SleepPeriod};
use crate::sleep::SleepCycleContext;

/// A sleep length the watchdog can time on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeoutBucket {
    pub threshold_ms: u32,
    pub timeout: WatchdogTimeout,
}

const fn bucket(threshold_ms: u32, timeout: WatchdogTimeout) -> TimeoutBucket {
    TimeoutBucket { threshold_ms, timeout }
}

/// Strictly descending. The short periods are credited below their nominal
/// length so that the oscillator tolerance does not make the node oversleep.
pub const TIMEOUT_BUCKETS: [TimeoutBucket; 10] = [
    bucket(8000, WatchdogTimeout::Ms8000),
    bucket(4000, WatchdogTimeout::Ms4000),
    bucket(2000, WatchdogTimeout::Ms2000),
    bucket(1000, WatchdogTimeout::Ms1000),
    bucket(500, WatchdogTimeout::Ms500),
    bucket(250, WatchdogTimeout::Ms250),
    bucket(120, WatchdogTimeout::Ms125),
    bucket(60, WatchdogTimeout::Ms64),
    bucket(30, WatchdogTimeout::Ms32),
    bucket(15, WatchdogTimeout::Ms16),
];

/// Shortest sleep that results in any cycle at all.
pub const MIN_SLEEP_MS: u32 = TIMEOUT_BUCKETS[TIMEOUT_BUCKETS.len() - 1].threshold_ms;

/// Greedy, largest-first bucket sequence for a duration.
#[derive(Clone, Debug)]
pub struct Decomposition {
    remaining_ms: u32,
    index: usize,
}

impl Decomposition {
    pub fn new(duration_ms: u32) -> Self {
        Self {
            remaining_ms: duration_ms,
            index: 0,
        }
    }

    /// Milliseconds not yet covered by a yielded bucket.
    pub fn remaining_ms(&self) -> u32 {
        self.remaining_ms
    }
}

impl Iterator for Decomposition {
    type Item = TimeoutBucket;

    fn next(&mut self) -> Option<TimeoutBucket> {
        while let Some(bucket) = TIMEOUT_BUCKETS.get(self.index) {
            if self.remaining_ms >= bucket.threshold_ms {
                self.remaining_ms -= bucket.threshold_ms;
                return Some(*bucket);
            }
            self.index += 1;
        }
        None
    }
}

/// Sleeps for about `duration_ms`, one bucket per power-down, stopping as
/// soon as an interrupt has been latched.
///
/// Anything shorter than `MIN_SLEEP_MS` left over at the end is not slept.
/// Returns that uncovered remainder (or whatever was left when an interrupt
/// cut the sleep short).
pub fn sleep_for_duration<H: SleepHardware>(
    controller: &mut SleepController<H>,
    ctx: &mut SleepCycleContext<'_>,
    duration_ms: u32,
) -> u32 {
    let mut plan = Decomposition::new(duration_ms);
    while !ctx.interrupted() {
        match plan.next() {
            Some(bucket) => controller.enter_cycle(ctx, SleepPeriod::Timeout(bucket.timeout)),
            None => break,
        }
    }
    plan.remaining_ms()
}
