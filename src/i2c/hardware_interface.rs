// Licensed under the Apache-2.0 license

//! Register-level seams between the protocol logic and the silicon.
//!
//! [`TwiRegisters`] covers the four TWI registers; [`BusLines`] covers the
//! GPIO view of the SCL/SDA pins, used only while the TWI is disabled during
//! bus recovery. The ATmega328P implementations live in `atmega328p`; tests
//! drive the same traits with a simulated peripheral.

/// TWCR: interrupt flag. Writing one clears it and starts the next operation.
pub const TWINT: u8 = 1 << 7;
/// TWCR: enable acknowledge.
pub const TWEA: u8 = 1 << 6;
/// TWCR: START condition.
pub const TWSTA: u8 = 1 << 5;
/// TWCR: STOP condition.
pub const TWSTO: u8 = 1 << 4;
/// TWCR: TWI enable.
pub const TWEN: u8 = 1 << 2;

/// TWSR prescaler bits TWPS1:0.
pub const TWPS_MASK: u8 = 0b0000_0011;

/// Access to the TWI register block.
///
/// A control write must take effect before the next read of any register,
/// and TWINT must stay set until software writes TWCR again.
pub trait TwiRegisters {
    fn write_control(&mut self, value: u8);
    fn read_control(&self) -> u8;
    fn read_status(&self) -> u8;
    fn write_status(&mut self, value: u8);
    fn write_data(&mut self, value: u8);
    fn read_data(&self) -> u8;
    fn write_bit_rate(&mut self, value: u8);

    /// True once the operation triggered by the last control write has finished.
    fn operation_complete(&self) -> bool {
        self.read_control() & TWINT != 0
    }
}

/// GPIO control of the two bus lines.
///
/// "Release" means input direction; with the output latch low no internal
/// pull-up is enabled and the line follows the external pull-up.
pub trait BusLines {
    fn set_scl_output(&mut self, output: bool);
    fn set_sda_output(&mut self, output: bool);
    fn set_scl_latch(&mut self, high: bool);
    fn set_sda_latch(&mut self, high: bool);
    fn sda_is_high(&self) -> bool;
}
