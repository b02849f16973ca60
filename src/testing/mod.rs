//! Host-side stand-in for the ATmega328P.
//!
//! `SimMcu` implements every hardware trait, records what the core does to
//! it, and plays back scripted wake-up events while the CPU "sleeps".

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use core::convert::Infallible;

use crate::hal::adc::BANDGAP_MUX;
use crate::hal::{
    AdcControl, ExternalInterrupts, FreeRunningCounter, Line, MemoryLayout, PowerControl,
    Prescaler, SleepMode, TriggerMode, WatchdogControl, WatchdogTimeout,
};
use crate::logger::LogSink;
use crate::sleep::InterruptLatch;

const WDIF: u8 = 0x80;
const WDIE: u8 = 0x40;
const WDE: u8 = 0x08;
const WDP_MASK: u8 = 0x27;
const ADEN: u8 = 0x80;
const ADPS_MASK: u8 = 0x07;
const ADPS_DIV128: u8 = 0x07;

const ALL_TIMEOUTS: [WatchdogTimeout; 10] = [
    WatchdogTimeout::Ms16,
    WatchdogTimeout::Ms32,
    WatchdogTimeout::Ms64,
    WatchdogTimeout::Ms125,
    WatchdogTimeout::Ms250,
    WatchdogTimeout::Ms500,
    WatchdogTimeout::Ms1000,
    WatchdogTimeout::Ms2000,
    WatchdogTimeout::Ms4000,
    WatchdogTimeout::Ms8000,
];

/// One observable hardware operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    AdcOff,
    AdcOn,
    AdcMux(u8),
    AdcPrepare,
    AdcRestore(u8),
    AdcStart,
    WatchdogSave,
    WatchdogRestore(u8),
    WatchdogArm(WatchdogTimeout),
    WatchdogDisable,
    WatchdogReset,
    WatchdogWake,
    SleepMode(SleepMode),
    SleepEnable,
    SleepDisable,
    BodDisable,
    Cli,
    Sei,
    SeiSleep,
    ClearPending(u8),
    Attach(u8, TriggerMode),
    Detach(u8),
    Isr(u8),
    CounterClear,
    CounterStart(Prescaler),
    CounterStop,
    CounterRestore,
    Flush,
}

/// Something that happens while the CPU is powered down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// The watchdog period runs out.
    Watchdog,
    /// An edge on one line.
    Line(u8),
    /// Edges on two lines, close enough to be serviced back to back.
    Lines(u8, u8),
}

/// Simulated MCU; `BOD` selects brown-out disable support.
pub struct SimMcu<const BOD: bool = true> {
    latch: &'static InterruptLatch,
    trace: Rc<RefCell<Vec<Op>>>,
    events: VecDeque<Event>,
    wdtcsr: u8,
    sleep_enabled: bool,
    interrupts_enabled: bool,
    slept: bool,
    attached: [bool; 2],
    pending: [bool; 2],
    elapsed_ms: u32,
    setups: u32,
    setup_edge: Option<(u8, u32)>,
    adc_enabled: bool,
    adc_prescaler: u8,
    adc_mux: u8,
    adc_reading: u16,
    adc_busy: u8,
    counter_settings: [u8; 3],
    counter_running: bool,
    counter: u16,
    window_ticks: u16,
    watchdog_busy: u8,
    stack_pointer: usize,
    heap_end: usize,
}

impl SimMcu {
    pub fn new() -> Self {
        Self::build()
    }
}

impl SimMcu<false> {
    pub fn without_bod_disable() -> Self {
        Self::build()
    }
}

impl<const BOD: bool> SimMcu<BOD> {
    fn build() -> Self {
        Self {
            // one latch per simulated node, like the static on target
            latch: Box::leak(Box::new(InterruptLatch::new())),
            trace: Rc::new(RefCell::new(Vec::new())),
            events: VecDeque::new(),
            wdtcsr: 0,
            sleep_enabled: false,
            interrupts_enabled: true,
            slept: false,
            attached: [false; 2],
            pending: [false; 2],
            elapsed_ms: 0,
            setups: 0,
            setup_edge: None,
            // reset state: off, clock /2
            adc_enabled: false,
            adc_prescaler: 0,
            adc_mux: 0x00,
            adc_reading: 341,
            adc_busy: 0,
            counter_settings: [0; 3],
            counter_running: false,
            counter: 0,
            // 500ms at 16MHz / 1024
            window_ticks: 7812,
            watchdog_busy: 0,
            stack_pointer: 0x08A0,
            heap_end: 0x0300,
        }
    }

    pub fn latch(&self) -> &'static InterruptLatch {
        self.latch
    }

    pub fn script(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    pub fn with_adc_reading(mut self, reading: u16) -> Self {
        self.adc_reading = reading;
        self
    }

    pub fn with_adc_settings(mut self, settings: u8) -> Self {
        self.adc_enabled = settings & ADEN != 0;
        self.adc_prescaler = settings & ADPS_MASK;
        self
    }

    pub fn with_window_ticks(mut self, ticks: u16) -> Self {
        self.window_ticks = ticks;
        self
    }

    pub fn with_memory(mut self, stack_pointer: usize, heap_end: usize) -> Self {
        self.stack_pointer = stack_pointer;
        self.heap_end = heap_end;
        self
    }

    pub fn set_watchdog_register(&mut self, value: u8) {
        self.wdtcsr = value;
    }

    pub fn set_counter_settings(&mut self, settings: [u8; 3]) {
        self.counter_settings = settings;
    }

    /// Masks interrupts without recording it.
    pub fn mask_interrupts(&mut self) {
        self.interrupts_enabled = false;
    }

    /// Raises `line` while the `cycle`-th power-down (counted from 1) is
    /// being set up, after the caller's last look at the latch.
    pub fn raise_during_setup(&mut self, line: u8, cycle: u32) {
        self.setup_edge = Some((line, cycle));
    }

    /// Signals an edge on `line`: the vector runs at once when the line is
    /// attached and interrupts are on, otherwise the flag stays pending.
    /// Returns whether the vector ran.
    pub fn raise(&mut self, line: u8) -> bool {
        let i = usize::from(line);
        if self.attached[i] && self.interrupts_enabled {
            self.fire(line);
            true
        } else {
            self.pending[i] = true;
            false
        }
    }

    pub fn trace(&self) -> Vec<Op> {
        self.trace.borrow().clone()
    }

    pub fn clear_trace(&mut self) {
        self.trace.borrow_mut().clear();
    }

    pub fn armed_timeouts(&self) -> Vec<WatchdogTimeout> {
        self.trace
            .borrow()
            .iter()
            .filter_map(|op| match *op {
                Op::WatchdogArm(timeout) => Some(timeout),
                _ => None,
            })
            .collect()
    }

    pub fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    pub fn slept(&self) -> bool {
        self.slept
    }

    pub fn is_attached(&self, line: u8) -> bool {
        self.attached[usize::from(line)]
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts_enabled
    }

    pub fn watchdog_register(&self) -> u8 {
        self.wdtcsr
    }

    pub fn adc_enabled(&self) -> bool {
        self.adc_enabled
    }

    pub fn adc_mux_value(&self) -> u8 {
        self.adc_mux
    }

    pub fn counter_control(&self) -> [u8; 3] {
        self.counter_settings
    }

    fn push(&self, op: Op) {
        self.trace.borrow_mut().push(op);
    }

    fn fire(&mut self, line: u8) {
        self.pending[usize::from(line)] = false;
        self.push(Op::Isr(line));
        let latch = self.latch;
        latch.on_interrupt(Line(line), self);
    }

    fn service_pending(&mut self) -> bool {
        let mut serviced = false;
        for line in 0..2u8 {
            let i = usize::from(line);
            if self.pending[i] && self.attached[i] {
                self.fire(line);
                serviced = true;
            }
        }
        serviced
    }

    fn armed_period(&self) -> Option<WatchdogTimeout> {
        let bits = self.wdtcsr & WDP_MASK;
        ALL_TIMEOUTS
            .iter()
            .copied()
            .find(|timeout| timeout.prescaler_bits() == bits)
    }

    fn watchdog_expired(&mut self) -> bool {
        if self.wdtcsr & WDIE != 0 {
            self.push(Op::WatchdogWake);
            self.elapsed_ms += self.armed_period().map_or(0, WatchdogTimeout::period_ms);
            true
        } else if self.wdtcsr & WDE != 0 {
            panic!("watchdog in reset mode would reset the node");
        } else {
            false
        }
    }
}

impl<const BOD: bool> WatchdogControl for SimMcu<BOD> {
    type Settings = u8;

    fn watchdog_settings(&self) -> u8 {
        self.push(Op::WatchdogSave);
        self.wdtcsr
    }

    fn restore_watchdog(&mut self, settings: u8) {
        self.push(Op::WatchdogRestore(settings));
        self.wdtcsr = settings & !WDIF;
    }

    fn arm_watchdog(&mut self, timeout: WatchdogTimeout) {
        self.push(Op::WatchdogArm(timeout));
        self.wdtcsr = WDIE | timeout.prescaler_bits();
    }

    fn disable_watchdog(&mut self) {
        self.push(Op::WatchdogDisable);
        self.wdtcsr = 0;
    }

    fn reset_watchdog(&mut self) {
        self.push(Op::WatchdogReset);
    }

    fn poll_watchdog(&mut self) -> nb::Result<(), Infallible> {
        assert!(self.wdtcsr & (WDIE | WDE) != 0, "polling a stopped watchdog");
        if self.watchdog_busy < 4 {
            self.watchdog_busy += 1;
            return Err(nb::Error::WouldBlock);
        }
        self.watchdog_busy = 0;
        if self.counter_running {
            self.counter = self.window_ticks;
        }
        Ok(())
    }
}

impl<const BOD: bool> PowerControl for SimMcu<BOD> {
    const SUPPORTS_BOD_DISABLE: bool = BOD;

    fn set_sleep_mode(&mut self, mode: SleepMode) {
        self.push(Op::SleepMode(mode));
        self.setups += 1;
        if let Some((line, cycle)) = self.setup_edge {
            if cycle == self.setups {
                self.setup_edge = None;
                self.raise(line);
            }
        }
    }

    fn enable_sleep(&mut self) {
        self.push(Op::SleepEnable);
        self.sleep_enabled = true;
    }

    fn disable_sleep(&mut self) {
        self.push(Op::SleepDisable);
        self.sleep_enabled = false;
    }


    fn disable_interrupts(&mut self) {
        self.push(Op::Cli);
        self.interrupts_enabled = false;
    }

    fn enable_interrupts(&mut self) {
        self.push(Op::Sei);
        self.interrupts_enabled = true;
        self.service_pending();
    }

    fn enable_interrupts_and_sleep(&mut self) {
        self.push(Op::SeiSleep);
        self.interrupts_enabled = true;
        if !self.sleep_enabled {
            self.service_pending();
            return;
        }
        // The instruction after `sei` runs first, so the CPU halts even with
        // a flag pending; that flag then wakes it right away.
        self.slept = true;
        if self.service_pending() {
            return;
        }
        loop {
            let Some(event) = self.events.pop_front() else {
                panic!("nothing left to wake the node: {:?}", self.trace());
            };
            let woke = match event {
                Event::Watchdog => self.watchdog_expired(),
                Event::Line(line) => self.raise(line),
                Event::Lines(first, second) => {
                    let a = self.raise(first);
                    let b = self.raise(second);
                    a || b
                }
            };
            if woke {
                return;
            }
        }
    }

    fn disable_brown_out_and_sleep(&mut self) {
        self.push(Op::BodDisable);
        self.enable_interrupts_and_sleep();
    }
}

impl<const BOD: bool> ExternalInterrupts for SimMcu<BOD> {
    const LINES: u8 = 2;

    fn clear_pending(&mut self, line: Line) {
        self.push(Op::ClearPending(line.0));
        self.pending[usize::from(line.0)] = false;
    }

    fn attach(&mut self, line: Line, mode: TriggerMode) {
        self.push(Op::Attach(line.0, mode));
        self.attached[usize::from(line.0)] = true;
    }

    fn detach(&mut self, line: Line) {
        self.push(Op::Detach(line.0));
        self.attached[usize::from(line.0)] = false;
    }
}

impl<const BOD: bool> AdcControl for SimMcu<BOD> {
    fn enable_adc(&mut self) {
        self.push(Op::AdcOn);
        self.adc_enabled = true;
    }

    fn disable_adc(&mut self) {
        self.push(Op::AdcOff);
        self.adc_enabled = false;
    }

    fn adc_settings(&self) -> u8 {
        let enabled = if self.adc_enabled { ADEN } else { 0 };
        enabled | self.adc_prescaler
    }

    fn restore_adc(&mut self, settings: u8) {
        self.push(Op::AdcRestore(settings));
        self.adc_enabled = settings & ADEN != 0;
        self.adc_prescaler = settings & ADPS_MASK;
    }

    fn prepare_adc(&mut self) {
        self.push(Op::AdcPrepare);
        self.adc_enabled = true;
        self.adc_prescaler = ADPS_DIV128;
    }

    fn adc_mux(&self) -> u8 {
        self.adc_mux
    }

    fn set_adc_mux(&mut self, mux: u8) {
        self.push(Op::AdcMux(mux));
        self.adc_mux = mux;
    }

    fn select_bandgap(&mut self) {
        self.set_adc_mux(BANDGAP_MUX);
    }

    fn start_conversion(&mut self) {
        assert!(self.adc_enabled, "conversion started with the ADC off");
        assert_eq!(self.adc_prescaler, ADPS_DIV128, "ADC clocked above 200kHz");
        self.push(Op::AdcStart);
        self.adc_busy = 3;
    }

    fn read_conversion(&mut self) -> nb::Result<u16, Infallible> {
        if self.adc_busy > 0 {
            self.adc_busy -= 1;
            return Err(nb::Error::WouldBlock);
        }
        Ok(self.adc_reading)
    }
}

impl<const BOD: bool> FreeRunningCounter for SimMcu<BOD> {
    type Settings = [u8; 3];

    fn counter_settings(&self) -> [u8; 3] {
        self.counter_settings
    }

    fn restore_counter(&mut self, settings: [u8; 3]) {
        self.push(Op::CounterRestore);
        self.counter_settings = settings;
    }

    fn clear_counter(&mut self) {
        self.push(Op::CounterClear);
        self.counter_settings = [0; 3];
        self.counter_running = false;
        self.counter = 0;
    }

    fn start_counter(&mut self, prescaler: Prescaler) {
        self.push(Op::CounterStart(prescaler));
        self.counter_settings[1] = prescaler as u8;
        self.counter_running = true;
    }

    fn stop_counter(&mut self) {
        self.push(Op::CounterStop);
        self.counter_settings[1] = 0;
        self.counter_running = false;
    }

    fn count(&self) -> u16 {
        self.counter
    }
}

impl<const BOD: bool> MemoryLayout for SimMcu<BOD> {
    fn stack_pointer(&self) -> usize {
        self.stack_pointer
    }

    fn heap_end(&self) -> usize {
        self.heap_end
    }
}

/// Collects log output; flushes show up in the MCU trace when attached.
#[derive(Default)]
pub struct TraceSink {
    text: String,
    flushes: usize,
    trace: Option<Rc<RefCell<Vec<Op>>>>,
}

impl TraceSink {
    pub fn attached_to<const BOD: bool>(mcu: &SimMcu<BOD>) -> Self {
        Self {
            trace: Some(Rc::clone(&mcu.trace)),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl ufmt::uWrite for TraceSink {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        self.text.push_str(s);
        Ok(())
    }
}

impl LogSink for TraceSink {
    fn flush(&mut self) {
        self.flushes += 1;
        if let Some(trace) = &self.trace {
            trace.borrow_mut().push(Op::Flush);
        }
    }
}

macro_rules! assert_within {
    ($value:expr, $target:expr, $tolerance:expr) => {
        let value = i64::from($value);
        let target = i64::from($target);
        let tolerance = i64::from($tolerance);
        assert!(
            (value - target).abs() <= tolerance,
            "`{}` = {} is not within {} of {}",
            stringify!($value),
            value,
            tolerance,
            target,
        );
    };
}

pub(crate) use assert_within;
