// Licensed under the Apache-2.0 license

//! Polled TWI master driver.
//!
//! [`Twi`] owns the register block, the recovery lines, a delay source and a
//! logger. Every primitive triggers one hardware operation, polls TWINT with a
//! bounded number of fixed-length waits, and checks TWSR against the state the
//! protocol expects at that step:
//!
//! ```text
//! IDLE -> STARTED -> ADDRESSED -> TRANSFERRING* -> STOPPED
//!                        ^              |
//!                        +-- repeated --+
//!                            START
//! ```
//!
//! A failing primitive returns immediately. Composite operations stop at the
//! first failure and do not send STOP; the caller decides between
//! [`Twi::stop`] and [`Twi::recover`].

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::{address_byte, Direction, TwiConfig, MAX_SEVEN_BIT_ADDRESS};
use crate::i2c::error::{Error, Stage};
use crate::i2c::hardware_interface::{
    BusLines, TwiRegisters, TWEA, TWEN, TWINT, TWPS_MASK, TWSTA, TWSTO,
};
use crate::i2c::status::Status;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::Operation;

/// Result of [`Twi::recover`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Recovery {
    /// SDA was already released; no clocks were sent.
    BusIdle,
    /// The slave let go of SDA after this many SCL pulses.
    Released { clocks: u8 },
    /// SDA was still low after the configured number of pulses.
    StillHeld,
}

/// Exclusive handle on the one TWI bus.
pub struct Twi<R: TwiRegisters, P: BusLines, D: DelayNs, L: Logger = NoOpLogger> {
    regs: R,
    lines: P,
    delay: D,
    logger: L,
    config: TwiConfig,
}

impl<R: TwiRegisters, P: BusLines, D: DelayNs> Twi<R, P, D, NoOpLogger> {
    /// Take ownership of the peripheral and run [`Twi::init`].
    pub fn new(regs: R, lines: P, delay: D, config: TwiConfig) -> Self {
        Self::with_logger(regs, lines, delay, config, NoOpLogger)
    }
}

impl<R: TwiRegisters, P: BusLines, D: DelayNs, L: Logger> Twi<R, P, D, L> {
    pub fn with_logger(regs: R, lines: P, delay: D, config: TwiConfig, logger: L) -> Self {
        let mut twi = Self {
            regs,
            lines,
            delay,
            logger,
            config,
        };
        twi.init();
        twi
    }

    #[must_use]
    pub fn config(&self) -> &TwiConfig {
        &self.config
    }

    pub(crate) fn set_config(&mut self, config: TwiConfig) {
        self.config = config;
    }

    /// Release the owned parts.
    pub fn free(self) -> (R, P, D, L) {
        (self.regs, self.lines, self.delay, self.logger)
    }

    /// Prescaler 1 and the configured bit rate.
    pub fn init(&mut self) {
        let twsr = self.regs.read_status();
        self.regs.write_status(twsr & !TWPS_MASK);
        self.regs.write_bit_rate(self.config.bit_rate());
    }

    /// Free a slave that is holding SDA low, then re-run [`Twi::init`].
    ///
    /// The TWI is disabled so the pins fall back to GPIO control. SCL is
    /// pulsed until SDA reads high or `recovery.max_clocks` pulses were sent,
    /// which lets a slave stuck mid-byte shift out its remaining bits. Both
    /// lines are left as inputs with their latches low whatever the outcome,
    /// so the bus idles on the external pull-ups before the next START.
    pub fn recover(&mut self) -> Recovery {
        let recovery = self.config.recovery;

        self.regs.write_status(0);
        self.regs.write_control(0);

        self.lines.set_sda_output(false);
        self.lines.set_sda_latch(false);
        self.lines.set_scl_latch(true);
        self.lines.set_scl_output(true);
        self.delay.delay_ms(recovery.half_period_ms);

        let outcome = if self.lines.sda_is_high() {
            Recovery::BusIdle
        } else {
            let mut outcome = Recovery::StillHeld;
            for clock in 1..=recovery.max_clocks {
                self.lines.set_scl_latch(false);
                self.delay.delay_ms(recovery.half_period_ms);
                self.lines.set_scl_latch(true);
                self.delay.delay_ms(recovery.half_period_ms);
                if self.lines.sda_is_high() {
                    outcome = Recovery::Released { clocks: clock };
                    break;
                }
            }
            outcome
        };

        self.lines.set_scl_output(false);
        self.lines.set_sda_output(false);
        self.lines.set_scl_latch(false);
        self.lines.set_sda_latch(false);

        match outcome {
            Recovery::BusIdle => {}
            Recovery::Released { clocks } => {
                self.logger
                    .debug(format_args!("twi recover: SDA released after {} clocks", clocks));
            }
            Recovery::StillHeld => {
                self.logger.error(format_args!(
                    "twi recover: SDA still low after {} clocks",
                    recovery.max_clocks
                ));
            }
        }

        self.init();
        outcome
    }

    /// Wait for TWINT and return the resulting status.
    fn wait(&mut self, stage: Stage) -> Result<Status, Error> {
        let poll = self.config.poll;
        let mut polls: u8 = 0;
        while !self.regs.operation_complete() {
            if polls >= poll.max_polls {
                let status = Status::from_twsr(self.regs.read_status());
                self.logger.error(format_args!(
                    "twi {}: timeout status=0x{:02X}",
                    stage.name(),
                    status.code()
                ));
                return Err(Error::Timeout { stage });
            }
            self.delay.delay_us(poll.poll_interval_us);
            polls += 1;
        }
        Ok(Status::from_twsr(self.regs.read_status()))
    }

    fn expect(&mut self, stage: Stage, status: Status, accepted: &[Status]) -> Result<(), Error> {
        if accepted.contains(&status) {
            Ok(())
        } else {
            self.logger.error(format_args!(
                "twi {}: unexpected status=0x{:02X}",
                stage.name(),
                status.code()
            ));
            Err(Error::Bus { stage, status })
        }
    }

    fn send_start(&mut self, address: u8, direction: Direction) -> Result<(), Error> {
        self.regs.write_control(TWINT | TWSTA | TWEN);
        let status = self.wait(Stage::Start)?;
        self.expect(Stage::Start, status, &[Status::Start, Status::RepeatedStart])?;

        self.regs.write_data(address_byte(address, direction));
        self.regs.write_control(TWINT | TWEN);
        let status = self.wait(Stage::Address)?;
        let acked = match direction {
            Direction::Write => Status::AddrWriteAck,
            Direction::Read => Status::AddrReadAck,
        };
        self.expect(Stage::Address, status, &[acked])
    }

    fn check_address(address: u8) -> Result<(), Error> {
        if address > MAX_SEVEN_BIT_ADDRESS {
            Err(Error::InvalidAddress(address))
        } else {
            Ok(())
        }
    }

    /// START, then SLA+R/W.
    ///
    /// TWCR is cleared first so a transaction abandoned after an earlier
    /// failure does not leave the TWI state machine mid-transfer.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidAddress`] before any register access, otherwise
    /// [`Error::Timeout`] or [`Error::Bus`] (NACK, arbitration lost).
    pub fn start(&mut self, address: u8, direction: Direction) -> Result<(), Error> {
        Self::check_address(address)?;
        self.regs.write_control(0);
        self.send_start(address, direction)
    }

    /// START issued inside a transaction to switch direction, without STOP.
    ///
    /// # Errors
    ///
    /// Same as [`Twi::start`].
    pub fn repeated_start(&mut self, address: u8, direction: Direction) -> Result<(), Error> {
        Self::check_address(address)?;
        self.send_start(address, direction)
    }

    /// Send one data byte; the slave must ACK it.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] or [`Error::Bus`] carrying the NACK status.
    pub fn write(&mut self, byte: u8) -> Result<(), Error> {
        self.regs.write_data(byte);
        self.regs.write_control(TWINT | TWEN);
        let status = self.wait(Stage::Write)?;
        self.expect(Stage::Write, status, &[Status::DataWriteAck])
    }

    /// Receive a byte and ACK it; more bytes will be requested.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] only. The received byte is returned whatever TWSR says.
    pub fn read_ack(&mut self) -> Result<u8, Error> {
        self.regs.write_control(TWINT | TWEN | TWEA);
        self.wait(Stage::ReadAck)?;
        Ok(self.regs.read_data())
    }

    /// Receive the last byte and NACK it, so the slave releases SDA.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] only.
    pub fn read_nack(&mut self) -> Result<u8, Error> {
        self.regs.write_control(TWINT | TWEN);
        self.wait(Stage::ReadNack)?;
        Ok(self.regs.read_data())
    }

    /// Request a STOP condition. Does not wait for it to appear on the bus.
    pub fn stop(&mut self) {
        self.regs.write_control(TWINT | TWEN | TWSTO);
    }

    /// Fill `buffer` with ACKed reads and a final NACKed read.
    fn read_sequence(&mut self, buffer: &mut [u8]) -> Result<(), Error> {
        if let Some((last, head)) = buffer.split_last_mut() {
            for byte in head {
                *byte = self.read_ack()?;
            }
            *last = self.read_nack()?;
        }
        Ok(())
    }

    /// START, SLA+W, every byte of `data`, STOP.
    ///
    /// # Errors
    ///
    /// The first primitive failure. STOP is not sent in that case.
    pub fn transmit(&mut self, address: u8, data: &[u8]) -> Result<(), Error> {
        self.start(address, Direction::Write)?;
        for &byte in data {
            self.write(byte)?;
        }
        self.stop();
        Ok(())
    }

    /// START, SLA+R, `data.len()` reads (last one NACKed), STOP.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyBuffer`] without touching the bus, or the first primitive failure.
    pub fn receive(&mut self, address: u8, data: &mut [u8]) -> Result<(), Error> {
        if data.is_empty() {
            return Err(Error::EmptyBuffer);
        }
        self.start(address, Direction::Read)?;
        self.read_sequence(data)?;
        self.stop();
        Ok(())
    }

    /// Select `register` on a register-mapped device and write `data` from there.
    ///
    /// # Errors
    ///
    /// The first primitive failure.
    pub fn write_register(&mut self, device: u8, register: u8, data: &[u8]) -> Result<(), Error> {
        self.start(device, Direction::Write)?;
        self.write(register)?;
        for &byte in data {
            self.write(byte)?;
        }
        self.stop();
        Ok(())
    }

    /// Select `register`, then repeated START in read mode and fill `data`.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyBuffer`] without touching the bus, or the first primitive failure.
    pub fn read_register(
        &mut self,
        device: u8,
        register: u8,
        data: &mut [u8],
    ) -> Result<(), Error> {
        if data.is_empty() {
            return Err(Error::EmptyBuffer);
        }
        self.start(device, Direction::Write)?;
        self.write(register)?;
        self.repeated_start(device, Direction::Read)?;
        self.read_sequence(data)?;
        self.stop();
        Ok(())
    }

    /// Write `bytes`, then repeated START and read into `buffer`.
    pub(crate) fn write_then_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Error> {
        self.start(address, Direction::Write)?;
        for &byte in bytes {
            self.write(byte)?;
        }
        if !buffer.is_empty() {
            self.repeated_start(address, Direction::Read)?;
            self.read_sequence(buffer)?;
        }
        self.stop();
        Ok(())
    }

    /// Run `embedded-hal` operations as one transaction.
    ///
    /// START before the first operation and a repeated START whenever the
    /// direction changes. Adjacent reads are one read phase: only the last
    /// byte before a write or the end is NACKed, and empty reads inside the
    /// phase are skipped. A read phase with no bytes at all is rejected before
    /// START. A lone empty write probes the address.
    pub(crate) fn run_operations(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        check_read_phases(operations)?;

        let mut phase: Option<Direction> = None;
        let mut rest = operations;

        while let Some((op, tail)) = core::mem::take(&mut rest).split_first_mut() {
            let read_follows = read_continues(tail);
            match op {
                Operation::Write(bytes) => {
                    self.enter_phase(address, &mut phase, Direction::Write)?;
                    for &byte in bytes.iter() {
                        self.write(byte)?;
                    }
                }
                Operation::Read(buffer) => {
                    self.enter_phase(address, &mut phase, Direction::Read)?;
                    if let Some((last, head)) = buffer.split_last_mut() {
                        for byte in head {
                            *byte = self.read_ack()?;
                        }
                        *last = if read_follows {
                            self.read_ack()?
                        } else {
                            self.read_nack()?
                        };
                    }
                }
            }
            rest = tail;
        }

        if phase.is_some() {
            self.stop();
        }
        Ok(())
    }

    fn enter_phase(
        &mut self,
        address: u8,
        phase: &mut Option<Direction>,
        direction: Direction,
    ) -> Result<(), Error> {
        match *phase {
            Some(current) if current == direction => return Ok(()),
            Some(_) => self.repeated_start(address, direction)?,
            None => self.start(address, direction)?,
        }
        *phase = Some(direction);
        Ok(())
    }
}

/// Every run of adjacent reads must transfer at least one byte.
fn check_read_phases(operations: &[Operation<'_>]) -> Result<(), Error> {
    let mut run: Option<usize> = None;
    for op in operations {
        match op {
            Operation::Read(buffer) => *run.get_or_insert(0) += buffer.len(),
            Operation::Write(_) => {
                if run == Some(0) {
                    return Err(Error::EmptyBuffer);
                }
                run = None;
            }
        }
    }
    if run == Some(0) {
        Err(Error::EmptyBuffer)
    } else {
        Ok(())
    }
}

/// Whether the read phase goes on with more bytes after the current operation.
fn read_continues(rest: &[Operation<'_>]) -> bool {
    let next = rest
        .iter()
        .find(|op| !matches!(op, Operation::Read(buffer) if buffer.is_empty()));
    matches!(next, Some(Operation::Read(_)))
}
