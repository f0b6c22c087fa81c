// Licensed under the Apache-2.0 license

//! High-level I2C controller abstraction.
//!
//! [`I2cController`] exposes any [`I2cMaster`] through `embedded_hal::i2c::I2c`
//! so ecosystem device drivers can use the bus. Unlike the raw driver it never
//! leaves the bus mid-transaction: when an operation fails after START it
//! sends STOP, and every failure is logged before the error is returned.

use crate::common::{Logger, NoOpLogger};
use crate::i2c::traits::{I2cMaster, RegisterAccess};
use embedded_hal::i2c::{Operation, SevenBitAddress};

pub struct I2cController<H: I2cMaster, L: Logger = NoOpLogger> {
    pub hardware: H,
    pub logger: L,
}

impl<H: I2cMaster> I2cController<H, NoOpLogger> {
    pub fn new(hardware: H) -> Self {
        Self {
            hardware,
            logger: NoOpLogger,
        }
    }
}

impl<H: I2cMaster, L: Logger> I2cController<H, L> {
    pub fn with_logger(hardware: H, logger: L) -> Self {
        Self { hardware, logger }
    }

    fn settle<T>(
        &mut self,
        op: &str,
        addr: SevenBitAddress,
        result: Result<T, H::Error>,
    ) -> Result<T, H::Error> {
        if let Err(err) = &result {
            if H::needs_release(err) {
                self.hardware.release_bus();
            }
            self.logger
                .error(format_args!("i2c {} 0x{:02X} failed: {:?}", op, addr, err));
        }
        result
    }
}

impl<H: I2cMaster + RegisterAccess, L: Logger> I2cController<H, L> {
    /// # Errors
    ///
    /// The underlying driver error; a transfer left open has been stopped.
    pub fn write_register(
        &mut self,
        device: SevenBitAddress,
        register: u8,
        data: &[u8],
    ) -> Result<(), H::Error> {
        let result = RegisterAccess::write_register(&mut self.hardware, device, register, data);
        self.settle("write_register", device, result)
    }

    /// # Errors
    ///
    /// The underlying driver error; a transfer left open has been stopped.
    pub fn read_register(
        &mut self,
        device: SevenBitAddress,
        register: u8,
        data: &mut [u8],
    ) -> Result<(), H::Error> {
        let result = RegisterAccess::read_register(&mut self.hardware, device, register, data);
        self.settle("read_register", device, result)
    }
}

impl<H: I2cMaster, L: Logger> embedded_hal::i2c::ErrorType for I2cController<H, L> {
    type Error = H::Error;
}

impl<H: I2cMaster, L: Logger> embedded_hal::i2c::I2c for I2cController<H, L> {
    fn read(&mut self, addr: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let result = self.hardware.read(addr, buffer);
        self.settle("read", addr, result)
    }

    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        let result = self.hardware.write(addr, bytes);
        self.settle("write", addr, result)
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        let result = self.hardware.write_read(addr, bytes, buffer);
        self.settle("write_read", addr, result)
    }

    fn transaction(
        &mut self,
        addr: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let result = self.hardware.transaction_slice(addr, operations);
        self.settle("transaction", addr, result)
    }
}
