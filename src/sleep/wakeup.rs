//! Public sleep entry points.

use ufmt::{uDisplay, uWrite, uwrite, uwriteln, Formatter};

use crate::hal::{Line, SleepHardware, TriggerMode};
use crate::logger::LogSink;
use crate::sleep::controller::{SleepController, SleepPeriod};
use crate::sleep::latch::{InterruptLatch, Slot};
use crate::sleep::scheduler::sleep_for_duration;
use crate::sleep::SleepCycleContext;

/// What ended a sleep call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WakeSource {
    Timer,
    Interrupt(Line),
}

impl WakeSource {
    /// Code reported to the protocol layer: -1 for the timer, otherwise the
    /// line number.
    pub fn code(self) -> i8 {
        match self {
            WakeSource::Timer => -1,
            WakeSource::Interrupt(line) => line.0 as i8,
        }
    }
}

impl uDisplay for WakeSource {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match *self {
            WakeSource::Timer => f.write_str("timer"),
            WakeSource::Interrupt(line) => uwrite!(f, "int{}", line.0),
        }
    }
}

/// Where a call is. Only kept as a debug aid: the calls are synchronous, so
/// outside of a debugger it reads `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WakeupState {
    Idle,
    ArmingInterrupts,
    Sleeping,
    Disarming,
}

impl WakeupState {
    fn can_advance_to(self, next: WakeupState) -> bool {
        use WakeupState::*;
        matches!(
            (self, next),
            (Idle, ArmingInterrupts)
                | (Idle, Sleeping)
                | (ArmingInterrupts, Sleeping)
                | (Sleeping, Disarming)
                | (Sleeping, Idle)
                | (Disarming, Idle)
        )
    }
}

/// Sleep API for the application and protocol layers.
///
/// Owns the hardware and the debug sink; the latch is shared with the
/// interrupt vectors. Calls do not overlap: each one runs to completion and
/// leaves the latch clear.
pub struct Wakeup<'a, H, L> {
    controller: SleepController<H>,
    latch: &'a InterruptLatch,
    log: L,
    state: WakeupState,
    last_cycles: u32,
}

impl<'a, H, L> Wakeup<'a, H, L>
where
    H: SleepHardware,
    L: LogSink,
{
    pub fn new(hw: H, latch: &'a InterruptLatch, log: L) -> Self {
        Self {
            controller: SleepController::new(hw),
            latch,
            log,
            state: WakeupState::Idle,
            last_cycles: 0,
        }
    }

    /// Power-down cycles the previous call went through.
    pub fn last_cycles(&self) -> u32 {
        self.last_cycles
    }

    /// For diagnostics between sleeps.
    pub fn hardware_mut(&mut self) -> &mut H {
        self.controller.hardware_mut()
    }

    pub fn log(&mut self) -> &mut L {
        &mut self.log
    }

    pub fn free(self) -> (H, L) {
        (self.controller.free(), self.log)
    }

    /// Sleeps for `ms`, in steps of at least `MIN_SLEEP_MS`. No interrupt
    /// line is armed, so this always reports the timer.
    pub fn sleep_for(&mut self, ms: u32) -> WakeSource {
        self.latch.clear();
        self.announce(ms);

        let mut ctx = SleepCycleContext::new(self.latch);
        self.advance(WakeupState::Sleeping);
        sleep_for_duration(&mut self.controller, &mut ctx, ms);
        self.last_cycles = ctx.cycles();

        self.advance(WakeupState::Idle);
        self.latch.clear();
        self.report(WakeSource::Timer)
    }

    /// Sleeps until `line` fires or `ms` elapse. `ms == 0` waits for the line
    /// only.
    pub fn sleep_until(&mut self, line: Line, mode: TriggerMode, ms: u32) -> WakeSource {
        self.sleep_until_either(line, mode, Line::NONE, TriggerMode::Low, ms)
    }

    /// Sleeps until either line fires or `ms` elapse, reporting whichever
    /// came first. A line that is `Line::NONE` (or that the controller does
    /// not have) is left unarmed.
    ///
    /// With `ms == 0` the node waits for an interrupt only, unless neither
    /// line could be armed: then nothing could wake it and it returns at once,
    /// as `sleep_for(0)` would.
    pub fn sleep_until_either(
        &mut self,
        line1: Line,
        mode1: TriggerMode,
        line2: Line,
        mode2: TriggerMode,
        ms: u32,
    ) -> WakeSource {
        self.latch.clear();
        self.announce(ms);

        let mut ctx = SleepCycleContext::new(self.latch);
        self.advance(WakeupState::ArmingInterrupts);
        let armed = {
            let hw = self.controller.hardware_mut();
            // An edge between attaching and sleeping stays pending until the
            // `sei; sleep` pair instead of being serviced too early.
            hw.disable_interrupts();
            let first = self.latch.bind(Slot::First, line1, mode1, hw);
            let second = self.latch.bind(Slot::Second, line2, mode2, hw);
            first || second
        };

        self.advance(WakeupState::Sleeping);
        if ms > 0 {
            sleep_for_duration(&mut self.controller, &mut ctx, ms);
        } else if armed {
            self.controller.enter_cycle(&mut ctx, SleepPeriod::Forever);
        }
        self.last_cycles = ctx.cycles();

        self.advance(WakeupState::Disarming);
        let hw = self.controller.hardware_mut();
        self.latch.unbind_all(hw);
        // Still masked if no cycle ran
        hw.enable_interrupts();

        let source = self
            .latch
            .first_fired()
            .map_or(WakeSource::Timer, WakeSource::Interrupt);
        self.latch.clear();
        self.advance(WakeupState::Idle);
        self.report(source)
    }

    fn advance(&mut self, next: WakeupState) {
        debug_assert!(self.state.can_advance_to(next), "{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn announce(&mut self, ms: u32) {
        uwriteln!(self.log, "sleep {}ms", ms).ok();
        // Output still in flight is lost when the clock stops
        self.log.flush();
    }

    fn report(&mut self, source: WakeSource) -> WakeSource {
        uwriteln!(self.log, "wake {} cycles={}", source, self.last_cycles).ok();
        source
    }
}
