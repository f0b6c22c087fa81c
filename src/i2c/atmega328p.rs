// Licensed under the Apache-2.0 license

//! ATmega328P bindings for the register and bus-line traits.
//!
//! SCL is PC5 and SDA is PC4. Only those two bits of the port registers are
//! ever modified.

use crate::i2c::hardware_interface::{BusLines, TwiRegisters};
use avr_device::atmega328p::{PORTC, TWI};

const SDA: u8 = 1 << 4;
const SCL: u8 = 1 << 5;

/// TWI register block (TWBR, TWSR, TWDR, TWCR).
pub struct Atmega328pTwi {
    twi: TWI,
}

impl Atmega328pTwi {
    pub fn new(twi: TWI) -> Self {
        Self { twi }
    }

    pub fn release(self) -> TWI {
        self.twi
    }
}

impl TwiRegisters for Atmega328pTwi {
    fn write_control(&mut self, value: u8) {
        self.twi.twcr.write(|w| unsafe { w.bits(value) });
    }

    fn read_control(&self) -> u8 {
        self.twi.twcr.read().bits()
    }

    fn read_status(&self) -> u8 {
        self.twi.twsr.read().bits()
    }

    fn write_status(&mut self, value: u8) {
        self.twi.twsr.write(|w| unsafe { w.bits(value) });
    }

    fn write_data(&mut self, value: u8) {
        self.twi.twdr.write(|w| unsafe { w.bits(value) });
    }

    fn read_data(&self) -> u8 {
        self.twi.twdr.read().bits()
    }

    fn write_bit_rate(&mut self, value: u8) {
        self.twi.twbr.write(|w| unsafe { w.bits(value) });
    }
}

/// PC4/PC5 as plain GPIO, for bus recovery while the TWI is disabled.
pub struct Atmega328pBusLines {
    port: PORTC,
}

impl Atmega328pBusLines {
    pub fn new(port: PORTC) -> Self {
        Self { port }
    }

    pub fn release(self) -> PORTC {
        self.port
    }

    fn update_ddr(&mut self, mask: u8, set: bool) {
        self.port.ddrc.modify(|r, w| {
            let bits = if set { r.bits() | mask } else { r.bits() & !mask };
            unsafe { w.bits(bits) }
        });
    }

    fn update_port(&mut self, mask: u8, set: bool) {
        self.port.portc.modify(|r, w| {
            let bits = if set { r.bits() | mask } else { r.bits() & !mask };
            unsafe { w.bits(bits) }
        });
    }
}

impl BusLines for Atmega328pBusLines {
    fn set_scl_output(&mut self, output: bool) {
        self.update_ddr(SCL, output);
    }

    fn set_sda_output(&mut self, output: bool) {
        self.update_ddr(SDA, output);
    }

    fn set_scl_latch(&mut self, high: bool) {
        self.update_port(SCL, high);
    }

    fn set_sda_latch(&mut self, high: bool) {
        self.update_port(SDA, high);
    }

    fn sda_is_high(&self) -> bool {
        self.port.pinc.read().bits() & SDA != 0
    }
}
