// Licensed under the Apache-2.0 license

//! # I2C Hardware Abstraction Traits
//!
//! Small traits that split a bus driver into the pieces callers actually
//! depend on, so higher layers (the `embedded-hal` adapter, device drivers)
//! stay generic over the hardware.
//!
//! ```text
//! I2cHardwareCore (foundation: init, timing, recovery)
//!     ├── I2cMaster (byte transactions)
//!     └── RegisterAccess (indexed register reads/writes)
//! ```

use crate::common::Logger;
use crate::i2c::common::{I2cSpeed, TwiConfig};
use crate::i2c::error::Error;
use crate::i2c::hardware_interface::{BusLines, TwiRegisters};
use crate::i2c::twi::{Recovery, Twi};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{AddressMode, Operation, SevenBitAddress};

/// Core I2C hardware interface providing basic operations
///
/// # Examples
///
/// ```rust,no_run
/// use atmega_twi::i2c::{I2cHardwareCore, I2cSpeed};
///
/// fn go_fast<T: I2cHardwareCore>(controller: &mut T) -> Result<u32, T::Error> {
///     controller.recover_bus()?;
///     controller.configure_timing(I2cSpeed::Fast)
/// }
/// ```
pub trait I2cHardwareCore {
    /// Hardware-specific error type that implements embedded-hal error traits
    type Error: embedded_hal::i2c::Error + core::fmt::Debug;

    /// Apply `config` and program the clock divisor.
    fn init(&mut self, config: &TwiConfig);

    /// Switch the bus clock to `speed`.
    ///
    /// # Returns
    ///
    /// The SCL frequency in Hz produced by the resulting divisor.
    ///
    /// # Errors
    ///
    /// Returns an error if the divisor for `speed` does not fit the hardware.
    fn configure_timing(&mut self, speed: I2cSpeed) -> Result<u32, Self::Error>;

    /// Attempt to recover the I2C bus from stuck conditions
    ///
    /// # Errors
    ///
    /// Returns an error if a slave still holds SDA low afterwards.
    fn recover_bus(&mut self) -> Result<(), Self::Error>;
}

/// I2C Master mode operations
///
/// Every method is a complete transaction: START, address, data, STOP.
/// On error the bus may be left mid-transaction; [`I2cMaster::release_bus`]
/// sends the STOP the failed transaction never reached.
///
/// # Examples
///
/// ```rust,no_run
/// use atmega_twi::i2c::I2cMaster;
///
/// fn read_sensor<T: I2cMaster>(i2c: &mut T) -> Result<u16, T::Error> {
///     let mut data = [0u8; 2];
///     i2c.read(0x48u8, &mut data)?;
///     Ok(u16::from_be_bytes(data))
/// }
/// ```
pub trait I2cMaster<A: AddressMode = SevenBitAddress>: I2cHardwareCore {
    /// # Errors
    ///
    /// Returns an error if the slave does not acknowledge, bus arbitration
    /// is lost, or the hardware does not complete in time.
    fn write(&mut self, addr: A, bytes: &[u8]) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// As [`I2cMaster::write`]; an empty `buffer` is rejected.
    fn read(&mut self, addr: A, buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Combined write-then-read with a repeated START, no STOP in between.
    ///
    /// # Errors
    ///
    /// Returns an error if either phase fails.
    fn write_read(&mut self, addr: A, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Execute a sequence of I2C operations as a single transaction
    ///
    /// # Errors
    ///
    /// Returns the first failure; later operations are not attempted.
    fn transaction_slice(
        &mut self,
        addr: A,
        ops_slice: &mut [Operation<'_>],
    ) -> Result<(), Self::Error>;

    /// Send STOP, releasing the bus after an aborted transaction.
    fn release_bus(&mut self);

    /// Whether `error` can leave a transaction open, so that
    /// [`I2cMaster::release_bus`] is needed.
    fn needs_release(error: &Self::Error) -> bool;
}

/// Register-mapped devices: write an index, then stream data to or from it.
pub trait RegisterAccess<A: AddressMode = SevenBitAddress>: I2cHardwareCore {
    /// # Errors
    ///
    /// Returns the first failing bus step.
    fn write_register(&mut self, device: A, register: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns the first failing bus step; an empty `data` is rejected.
    fn read_register(
        &mut self,
        device: A,
        register: u8,
        data: &mut [u8],
    ) -> Result<(), Self::Error>;
}

impl<R, P, D, L> I2cHardwareCore for Twi<R, P, D, L>
where
    R: TwiRegisters,
    P: BusLines,
    D: DelayNs,
    L: Logger,
{
    type Error = Error;

    fn init(&mut self, config: &TwiConfig) {
        self.set_config(*config);
        Twi::init(self);
    }

    fn configure_timing(&mut self, speed: I2cSpeed) -> Result<u32, Self::Error> {
        let mut config = *self.config();
        config.set_speed(speed)?;
        self.set_config(config);
        Twi::init(self);
        Ok(config.scl_frequency().to_Hz())
    }

    fn recover_bus(&mut self) -> Result<(), Self::Error> {
        match self.recover() {
            Recovery::BusIdle | Recovery::Released { .. } => Ok(()),
            Recovery::StillHeld => Err(Error::BusHung),
        }
    }
}

impl<R, P, D, L> I2cMaster for Twi<R, P, D, L>
where
    R: TwiRegisters,
    P: BusLines,
    D: DelayNs,
    L: Logger,
{
    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        self.transmit(addr, bytes)
    }

    fn read(&mut self, addr: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.receive(addr, buffer)
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.write_then_read(addr, bytes, buffer)
    }

    fn transaction_slice(
        &mut self,
        addr: SevenBitAddress,
        ops_slice: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.run_operations(addr, ops_slice)
    }

    fn release_bus(&mut self) {
        self.stop();
    }

    fn needs_release(error: &Self::Error) -> bool {
        error.left_transfer_open()
    }
}

impl<R, P, D, L> RegisterAccess for Twi<R, P, D, L>
where
    R: TwiRegisters,
    P: BusLines,
    D: DelayNs,
    L: Logger,
{
    fn write_register(
        &mut self,
        device: SevenBitAddress,
        register: u8,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        Twi::write_register(self, device, register, data)
    }

    fn read_register(
        &mut self,
        device: SevenBitAddress,
        register: u8,
        data: &mut [u8],
    ) -> Result<(), Self::Error> {
        Twi::read_register(self, device, register, data)
    }
}
