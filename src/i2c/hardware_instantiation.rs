// Licensed under the Apache-2.0 license

//! # TWI Hardware Instantiation for the ATmega328P
//!
//! The part has exactly one TWI. Building the bus handle from the PAC
//! singletons means the type system, not convention, guarantees there is
//! only one owner of the bus:
//!
//! ```rust,ignore
//! let dp = avr_device::atmega328p::Peripherals::take().unwrap();
//! let mut i2c = instantiate_hardware(dp.TWI, dp.PORTC, delay, TwiConfig::default());
//!
//! // Recover first: a slave may still hold SDA from before the reset.
//! i2c.hardware.recover();
//! i2c.write_register(0x68, 0x6B, &[0x00])?;
//! ```
//!
//! Diagnostics are off by default; [`instantiate_hardware_with_logger`]
//! routes them to a logger such as `UartLogger` over the USART.

use crate::common::{Logger, NoOpLogger};
use crate::i2c::atmega328p::{Atmega328pBusLines, Atmega328pTwi};
use crate::i2c::common::TwiConfig;
use crate::i2c::i2c_controller::I2cController;
use crate::i2c::twi::Twi;
use avr_device::atmega328p::{PORTC, TWI};
use embedded_hal::delay::DelayNs;

/// Bus driver on the ATmega328P TWI pins.
pub type Atmega328pI2c<D, L = NoOpLogger> = Twi<Atmega328pTwi, Atmega328pBusLines, D, L>;

/// `embedded-hal` controller wrapping [`Atmega328pI2c`].
pub type I2cControllerNoLog<D> = I2cController<Atmega328pI2c<D>, NoOpLogger>;

/// Build the bus controller without diagnostics.
#[must_use]
pub fn instantiate_hardware<D: DelayNs>(
    twi: TWI,
    portc: PORTC,
    delay: D,
    config: TwiConfig,
) -> I2cControllerNoLog<D> {
    let hardware = Twi::new(
        Atmega328pTwi::new(twi),
        Atmega328pBusLines::new(portc),
        delay,
        config,
    );
    I2cController::new(hardware)
}

/// Build the bus controller, sending driver and controller diagnostics to `logger`.
#[must_use]
pub fn instantiate_hardware_with_logger<D, L>(
    twi: TWI,
    portc: PORTC,
    delay: D,
    config: TwiConfig,
    logger: L,
) -> I2cController<Atmega328pI2c<D, L>, L>
where
    D: DelayNs,
    L: Logger + Clone,
{
    let hardware = Twi::with_logger(
        Atmega328pTwi::new(twi),
        Atmega328pBusLines::new(portc),
        delay,
        config,
        logger.clone(),
    );
    I2cController::with_logger(hardware, logger)
}
