// Licensed under the Apache-2.0 license

//! TWSR status codes for master transmitter and master receiver modes.

/// Status bits of TWSR; the low three bits hold the prescaler and a reserved bit.
pub const TWSR_STATUS_MASK: u8 = 0xF8;

/// Outcome of the most recently completed bus operation, as reported by TWSR.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// Illegal START or STOP observed on the bus.
    BusError,
    Start,
    RepeatedStart,
    AddrWriteAck,
    AddrWriteNack,
    DataWriteAck,
    DataWriteNack,
    /// Lost arbitration during SLA+R/W or data.
    ArbitrationLost,
    AddrReadAck,
    AddrReadNack,
    DataReadAck,
    DataReadNack,
    /// No relevant state information; TWINT is clear.
    NoInfo,
    /// Any code not defined for master operation (slave-mode states included).
    Unknown(u8),
}

impl Status {
    /// Decode a raw TWSR value, ignoring the prescaler bits.
    #[must_use]
    pub fn from_twsr(twsr: u8) -> Self {
        match twsr & TWSR_STATUS_MASK {
            0x00 => Self::BusError,
            0x08 => Self::Start,
            0x10 => Self::RepeatedStart,
            0x18 => Self::AddrWriteAck,
            0x20 => Self::AddrWriteNack,
            0x28 => Self::DataWriteAck,
            0x30 => Self::DataWriteNack,
            0x38 => Self::ArbitrationLost,
            0x40 => Self::AddrReadAck,
            0x48 => Self::AddrReadNack,
            0x50 => Self::DataReadAck,
            0x58 => Self::DataReadNack,
            0xF8 => Self::NoInfo,
            other => Self::Unknown(other),
        }
    }

    /// Raw status code, prescaler bits masked off.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::BusError => 0x00,
            Self::Start => 0x08,
            Self::RepeatedStart => 0x10,
            Self::AddrWriteAck => 0x18,
            Self::AddrWriteNack => 0x20,
            Self::DataWriteAck => 0x28,
            Self::DataWriteNack => 0x30,
            Self::ArbitrationLost => 0x38,
            Self::AddrReadAck => 0x40,
            Self::AddrReadNack => 0x48,
            Self::DataReadAck => 0x50,
            Self::DataReadNack => 0x58,
            Self::NoInfo => 0xF8,
            Self::Unknown(code) => code,
        }
    }
}
