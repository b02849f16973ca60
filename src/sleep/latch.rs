//! One-shot record of which external line ended a sleep cycle.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::hal::{ExternalInterrupts, Line, PowerControl, TriggerMode};

const NO_INTERRUPT: u8 = Line::NONE.0;

/// One of the two wake-up bindings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    First = 0,
    Second = 1,
}

/// Two line bindings plus the first line that fired.
///
/// Shared between the caller and the interrupt vectors. Handlers run with
/// interrupts masked and never nest, so plain loads and stores are enough to
/// keep the check-then-record step atomic (the target has no atomic
/// read-modify-write).
pub struct InterruptLatch {
    woken_by: AtomicU8,
    bound: [AtomicU8; 2],
}

impl InterruptLatch {
    pub const fn new() -> Self {
        Self {
            woken_by: AtomicU8::new(NO_INTERRUPT),
            bound: [AtomicU8::new(NO_INTERRUPT), AtomicU8::new(NO_INTERRUPT)],
        }
    }

    /// The first line that fired since the last `clear`.
    #[inline]
    pub fn first_fired(&self) -> Option<Line> {
        match self.woken_by.load(Ordering::SeqCst) {
            NO_INTERRUPT => None,
            line => Some(Line(line)),
        }
    }

    #[inline]
    pub fn interrupted(&self) -> bool {
        self.first_fired().is_some()
    }

    #[inline]
    pub fn clear(&self) {
        self.woken_by.store(NO_INTERRUPT, Ordering::SeqCst);
    }

    /// Line bound to `slot`, if any.
    pub fn bound(&self, slot: Slot) -> Option<Line> {
        match self.bound[slot as usize].load(Ordering::SeqCst) {
            NO_INTERRUPT => None,
            line => Some(Line(line)),
        }
    }

    /// Binds `line` to `slot`, dropping a stale pending flag first.
    ///
    /// Lines the controller does not have (including `Line::NONE`) leave the
    /// slot empty. Returns whether the line was attached.
    pub fn bind<I: ExternalInterrupts>(
        &self,
        slot: Slot,
        line: Line,
        mode: TriggerMode,
        irq: &mut I,
    ) -> bool {
        if !line.is_valid::<I>() {
            self.bound[slot as usize].store(NO_INTERRUPT, Ordering::SeqCst);
            return false;
        }
        self.bound[slot as usize].store(line.0, Ordering::SeqCst);
        irq.clear_pending(line);
        irq.attach(line, mode);
        true
    }

    /// Detaches whatever is bound, fired or not.
    pub fn unbind_all<I: ExternalInterrupts>(&self, irq: &mut I) {
        for slot in &self.bound {
            let line = slot.load(Ordering::SeqCst);
            slot.store(NO_INTERRUPT, Ordering::SeqCst);
            if line != NO_INTERRUPT {
                irq.detach(Line(line));
            }
        }
    }

    /// Interrupt handler body for `line`.
    ///
    /// Cancels a sleep that has not started yet, detaches the line so it
    /// fires once per cycle, and records it unless another line came first.
    pub fn on_interrupt<H>(&self, line: Line, hw: &mut H)
    where
        H: PowerControl + ExternalInterrupts,
    {
        let is_bound = self
            .bound
            .iter()
            .any(|slot| slot.load(Ordering::SeqCst) == line.0);

        if is_bound {
            hw.disable_sleep();
        }
        hw.detach(line);
        if is_bound && !self.interrupted() {
            self.woken_by.store(line.0, Ordering::SeqCst);
        }
    }
}

impl Default for InterruptLatch {
    fn default() -> Self {
        Self::new()
    }
}
