// Licensed under the Apache-2.0 license

//! Driver error type and its mapping onto `embedded-hal` error kinds.

use crate::i2c::common::ConfigurationError;
use crate::i2c::status::Status;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

/// Protocol step that was in progress when a primitive failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    /// START (or repeated START) condition.
    Start,
    /// SLA+R/W byte.
    Address,
    Write,
    ReadAck,
    ReadNack,
}

impl Stage {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Address => "address",
            Stage::Write => "write",
            Stage::ReadAck => "read_ack",
            Stage::ReadNack => "read_nack",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// TWINT never set within the poll bound.
    Timeout { stage: Stage },
    /// TWINT set, but TWSR reported something other than the expected state.
    Bus { stage: Stage, status: Status },
    /// Slave address does not fit in seven bits.
    InvalidAddress(u8),
    /// A read was requested into a zero-length buffer.
    EmptyBuffer,
    /// Recovery clocked the bus and SDA stayed low.
    BusHung,
    Config(ConfigurationError),
}

impl Error {
    /// Status observed by the failing primitive, if it got that far.
    #[must_use]
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::Bus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the failure happened after START, so a transfer may still
    /// be open on the bus. Validation errors are raised before any register
    /// access.
    #[must_use]
    pub fn left_transfer_open(&self) -> bool {
        matches!(self, Error::Timeout { .. } | Error::Bus { .. })
    }
}

impl From<ConfigurationError> for Error {
    fn from(err: ConfigurationError) -> Self {
        Error::Config(err)
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Bus { status, .. } => match status {
                Status::AddrWriteNack | Status::AddrReadNack => {
                    ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
                }
                Status::DataWriteNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
                Status::ArbitrationLost => ErrorKind::ArbitrationLoss,
                Status::BusError => ErrorKind::Bus,
                _ => ErrorKind::Other,
            },
            Error::BusHung => ErrorKind::Bus,
            Error::Timeout { .. }
            | Error::InvalidAddress(_)
            | Error::EmptyBuffer
            | Error::Config(_) => ErrorKind::Other,
        }
    }
}
