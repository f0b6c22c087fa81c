// Licensed under the Apache-2.0 license

//! ATmega TWI (I2C) master driver.
//!
//! The driver polls the TWI interrupt flag with a bounded wait instead of
//! using interrupts, so every operation either completes or returns
//! [`Error::Timeout`] after a fixed number of polls. Hardware access goes
//! through [`TwiRegisters`] and [`BusLines`], which lets the same driver run
//! against the real peripheral on AVR targets and a simulated bus in tests.
//!
//! Layers, bottom to top:
//!
//! - [`Twi`]: START/address/data/STOP primitives, composite transfers and
//!   nine-clock bus recovery.
//! - [`I2cHardwareCore`], [`I2cMaster`], [`RegisterAccess`]: traits over the
//!   driver for generic code.
//! - [`I2cController`]: `embedded_hal::i2c::I2c` adapter that releases the
//!   bus when a transfer fails.

pub mod common;
pub mod error;
pub mod hardware_interface;
pub mod i2c_controller;
pub mod status;
pub mod traits;
pub mod twi;

#[cfg(target_arch = "avr")]
pub mod atmega328p;
#[cfg(target_arch = "avr")]
pub mod hardware_instantiation;

#[cfg(test)]
pub mod sim;

pub use common::{
    ConfigurationError, Direction, I2cSpeed, PollConfig, RecoveryConfig, TwiConfig,
    TwiConfigBuilder,
};
pub use error::{Error, Stage};
pub use hardware_interface::{BusLines, TwiRegisters};
pub use i2c_controller::I2cController;
pub use status::Status;
pub use traits::{I2cHardwareCore, I2cMaster, RegisterAccess};
pub use twi::{Recovery, Twi};
