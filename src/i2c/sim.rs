// Licensed under the Apache-2.0 license

//! Simulated TWI peripheral for host tests.
//!
//! `SimBus` is a cheap, cloneable handle onto shared state, so a test can give
//! one clone to the driver as its register block and another as its bus lines
//! while keeping a third to inspect what happened. The attached slave is a
//! register-mapped echo device: the first byte written after SLA+W selects the
//! register pointer, further bytes are stored at the pointer, reads return the
//! stored bytes. The pointer auto-increments in both directions.

use crate::common::Logger;
use crate::i2c::hardware_interface::{BusLines, TwiRegisters, TWEA, TWEN, TWINT, TWSTA, TWSTO};
use core::cell::RefCell;
use core::fmt;
use std::rc::Rc;

/// Bus-level event observed by the simulated peripheral.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Start,
    RepeatedStart,
    Address(u8),
    Write(u8),
    ReadAck,
    ReadNack,
    Stop,
}

/// Class of operation a fault can be injected into.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SimOp {
    Start,
    Address,
    Write,
    Read,
    Any,
}

impl SimOp {
    fn matches(self, op: SimOp) -> bool {
        self == SimOp::Any || self == op
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Started,
    Writing,
    Reading,
    /// Address was NACKed; the hardware waits for STOP or repeated START.
    Rejected,
}

struct SimState {
    control: u8,
    status: u8,
    prescaler: u8,
    data: u8,
    bit_rate: Option<u8>,
    phase: Phase,
    busy_polls: u32,
    pending: u32,
    stall: Option<SimOp>,
    forced: Option<(SimOp, u8)>,
    triggers: u32,
    events: Vec<Event>,
    device_address: u8,
    ack_any_address: bool,
    registers: [u8; 256],
    pointer: u8,
    expect_pointer: bool,
    scl_output: bool,
    sda_output: bool,
    scl_latch: bool,
    sda_latch: bool,
    sda_hold_pulses: u32,
    scl_rising_edges: u32,
    us_waits: u32,
    ms_waits: u32,
}

impl SimState {
    fn scl_level(&self) -> bool {
        !(self.scl_output && !self.scl_latch)
    }

    fn complete(&mut self, op: SimOp, status: u8) {
        self.triggers += 1;
        self.status = match self.forced {
            Some((at, forced)) if at.matches(op) => forced,
            _ => status,
        };
        self.control &= !TWINT;
        self.pending = if self.stall.is_some_and(|at| at.matches(op)) {
            u32::MAX
        } else {
            self.busy_polls
        };
    }

    fn trigger(&mut self, value: u8) {
        if value & TWSTO != 0 {
            self.events.push(Event::Stop);
            self.phase = Phase::Idle;
            self.status = 0xF8;
            // STOP does not set TWINT
            self.control = value & !(TWINT | TWSTO);
            return;
        }

        if value & TWSTA != 0 {
            let status = if self.phase == Phase::Idle {
                self.events.push(Event::Start);
                0x08
            } else {
                self.events.push(Event::RepeatedStart);
                0x10
            };
            self.phase = Phase::Started;
            self.complete(SimOp::Start, status);
            return;
        }

        match self.phase {
            Phase::Started => {
                let byte = self.data;
                self.events.push(Event::Address(byte));
                let read = byte & 1 == 1;
                let acked = self.ack_any_address || byte >> 1 == self.device_address;
                let status = match (read, acked) {
                    (false, true) => 0x18,
                    (false, false) => 0x20,
                    (true, true) => 0x40,
                    (true, false) => 0x48,
                };
                self.phase = match (read, acked) {
                    (_, false) => Phase::Rejected,
                    (false, true) => Phase::Writing,
                    (true, true) => Phase::Reading,
                };
                self.expect_pointer = !read;
                self.complete(SimOp::Address, status);
            }
            Phase::Writing => {
                let byte = self.data;
                self.events.push(Event::Write(byte));
                if self.expect_pointer {
                    self.pointer = byte;
                    self.expect_pointer = false;
                } else {
                    self.registers[usize::from(self.pointer)] = byte;
                    self.pointer = self.pointer.wrapping_add(1);
                }
                self.complete(SimOp::Write, 0x28);
            }
            Phase::Reading => {
                let ack = value & TWEA != 0;
                self.events.push(if ack { Event::ReadAck } else { Event::ReadNack });
                self.data = self.registers[usize::from(self.pointer)];
                self.pointer = self.pointer.wrapping_add(1);
                self.complete(SimOp::Read, if ack { 0x50 } else { 0x58 });
            }
            Phase::Idle | Phase::Rejected => {
                // Nothing on the bus answers; TWINT never sets.
                self.triggers += 1;
                self.control &= !TWINT;
                self.pending = u32::MAX;
            }
        }
    }
}

/// Shared handle onto the simulated peripheral.
#[derive(Clone)]
pub struct SimBus {
    state: Rc<RefCell<SimState>>,
}

impl SimBus {
    /// Peripheral with an echo device at `device_address`.
    pub fn new(device_address: u8) -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState {
                control: 0,
                status: 0xF8,
                prescaler: 0,
                data: 0,
                bit_rate: None,
                phase: Phase::Idle,
                busy_polls: 0,
                pending: 0,
                stall: None,
                forced: None,
                triggers: 0,
                events: Vec::new(),
                device_address,
                ack_any_address: false,
                registers: [0; 256],
                pointer: 0,
                expect_pointer: false,
                scl_output: false,
                sda_output: false,
                scl_latch: false,
                sda_latch: false,
                sda_hold_pulses: 0,
                scl_rising_edges: 0,
                us_waits: 0,
                ms_waits: 0,
            })),
        }
    }

    /// Acknowledge every address, whatever the attached device's address is.
    pub fn ack_any_address(&self) {
        self.state.borrow_mut().ack_any_address = true;
    }

    /// Polls of TWCR that report TWINT clear before each operation completes.
    pub fn set_busy_polls(&self, polls: u32) {
        self.state.borrow_mut().busy_polls = polls;
    }

    /// Never set TWINT for operations of class `op`.
    pub fn stall_at(&self, op: SimOp) {
        self.state.borrow_mut().stall = Some(op);
    }

    /// Report `status` instead of the natural status for operations of class `op`.
    pub fn force_status(&self, op: SimOp, status: u8) {
        self.state.borrow_mut().forced = Some((op, status));
    }

    /// Slave keeps SDA low until SCL has risen `pulses` times.
    pub fn hold_sda_low(&self, pulses: u32) {
        self.state.borrow_mut().sda_hold_pulses = pulses;
    }

    pub fn set_prescaler_bits(&self, bits: u8) {
        self.state.borrow_mut().prescaler = bits & 0x03;
    }

    pub fn drive_lines(&self) {
        let mut state = self.state.borrow_mut();
        state.scl_output = true;
        state.sda_output = true;
        state.scl_latch = true;
        state.sda_latch = true;
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    /// Operations started by a control write with TWINT set (STOP excluded).
    pub fn triggers(&self) -> u32 {
        self.state.borrow().triggers
    }

    pub fn bit_rate(&self) -> Option<u8> {
        self.state.borrow().bit_rate
    }

    pub fn prescaler_bits(&self) -> u8 {
        self.state.borrow().prescaler
    }

    pub fn control(&self) -> u8 {
        self.state.borrow().control
    }

    pub fn register(&self, index: u8) -> u8 {
        self.state.borrow().registers[usize::from(index)]
    }

    pub fn set_registers(&self, start: u8, bytes: &[u8]) {
        let mut state = self.state.borrow_mut();
        for (offset, byte) in bytes.iter().enumerate() {
            state.registers[usize::from(start) + offset] = *byte;
        }
    }

    /// (scl_output, scl_latch, sda_output, sda_latch)
    pub fn line_config(&self) -> (bool, bool, bool, bool) {
        let state = self.state.borrow();
        (
            state.scl_output,
            state.scl_latch,
            state.sda_output,
            state.sda_latch,
        )
    }

    pub fn scl_rising_edges(&self) -> u32 {
        self.state.borrow().scl_rising_edges
    }

    pub fn us_waits(&self) -> u32 {
        self.state.borrow().us_waits
    }

    pub fn ms_waits(&self) -> u32 {
        self.state.borrow().ms_waits
    }

    /// Delay source that only counts, sharing this bus's state.
    pub fn delay(&self) -> SimDelay {
        SimDelay {
            state: Rc::clone(&self.state),
        }
    }
}

impl TwiRegisters for SimBus {
    fn write_control(&mut self, value: u8) {
        let mut state = self.state.borrow_mut();
        if value & TWINT != 0 && value & TWEN != 0 {
            state.control = value;
            state.trigger(value);
        } else {
            if value & TWEN == 0 {
                // Disabling the TWI abandons whatever was in progress.
                state.phase = Phase::Idle;
                state.pending = 0;
            }
            state.control = value;
        }
    }

    fn read_control(&self) -> u8 {
        let mut state = self.state.borrow_mut();
        if state.control & TWEN != 0 && state.pending == 0 && state.phase != Phase::Idle {
            state.control |= TWINT;
        } else if state.pending > 0 && state.pending != u32::MAX {
            state.pending -= 1;
        }
        state.control
    }

    fn read_status(&self) -> u8 {
        let state = self.state.borrow();
        state.status | state.prescaler
    }

    fn write_status(&mut self, value: u8) {
        self.state.borrow_mut().prescaler = value & 0x03;
    }

    fn write_data(&mut self, value: u8) {
        self.state.borrow_mut().data = value;
    }

    fn read_data(&self) -> u8 {
        self.state.borrow().data
    }

    fn write_bit_rate(&mut self, value: u8) {
        self.state.borrow_mut().bit_rate = Some(value);
    }
}

impl BusLines for SimBus {
    fn set_scl_output(&mut self, output: bool) {
        let mut state = self.state.borrow_mut();
        let was_high = state.scl_level();
        state.scl_output = output;
        note_scl_edge(&mut state, was_high);
    }

    fn set_sda_output(&mut self, output: bool) {
        self.state.borrow_mut().sda_output = output;
    }

    fn set_scl_latch(&mut self, high: bool) {
        let mut state = self.state.borrow_mut();
        let was_high = state.scl_level();
        state.scl_latch = high;
        note_scl_edge(&mut state, was_high);
    }

    fn set_sda_latch(&mut self, high: bool) {
        self.state.borrow_mut().sda_latch = high;
    }

    fn sda_is_high(&self) -> bool {
        let state = self.state.borrow();
        let driven_low = state.sda_output && !state.sda_latch;
        !driven_low && state.sda_hold_pulses == 0
    }
}

fn note_scl_edge(state: &mut SimState, was_high: bool) {
    if !was_high && state.scl_level() {
        state.scl_rising_edges += 1;
        state.sda_hold_pulses = state.sda_hold_pulses.saturating_sub(1);
    }
}

/// Counting delay attached to a [`SimBus`].
pub struct SimDelay {
    state: Rc<RefCell<SimState>>,
}

impl embedded_hal::delay::DelayNs for SimDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_us(&mut self, _us: u32) {
        self.state.borrow_mut().us_waits += 1;
    }

    fn delay_ms(&mut self, _ms: u32) {
        self.state.borrow_mut().ms_waits += 1;
    }
}

/// Logger keeping every line for later assertions.
#[derive(Clone, Default)]
pub struct RecordingLogger {
    lines: Rc<RefCell<Vec<String>>>,
}

impl RecordingLogger {
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl Logger for RecordingLogger {
    fn debug(&mut self, args: fmt::Arguments<'_>) {
        self.lines.borrow_mut().push(format!("D {args}"));
    }

    fn error(&mut self, args: fmt::Arguments<'_>) {
        self.lines.borrow_mut().push(format!("E {args}"));
    }
}
