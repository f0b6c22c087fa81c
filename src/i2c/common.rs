// Licensed under the Apache-2.0 license

//! Common types and constants for the TWI driver modules.
//!
//! This module provides the bus configuration (clock divisor, poll bounds,
//! recovery timing) and the small protocol helpers shared by the primitives.

use fugit::HertzU32;

/// Core clock of the reference board (Arduino Uno class, 16 MHz crystal).
pub const DEFAULT_CORE_CLOCK: HertzU32 = HertzU32::from_raw(16_000_000);

/// SCL frequencies supported by the TWI block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum I2cSpeed {
    Standard = 100_000,
    Fast = 400_000,
}

impl I2cSpeed {
    #[must_use]
    pub const fn frequency(self) -> HertzU32 {
        HertzU32::from_raw(self as u32)
    }
}

/// R/W bit appended to the slave address during the address phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    Write = 0,
    Read = 1,
}

/// Highest valid 7-bit slave address.
pub const MAX_SEVEN_BIT_ADDRESS: u8 = 0x7F;

/// Byte placed on the bus for the address phase: `(address << 1) | direction`.
///
/// The caller guarantees `address <= MAX_SEVEN_BIT_ADDRESS`.
#[must_use]
pub const fn address_byte(address: u8, direction: Direction) -> u8 {
    (address << 1) | direction as u8
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    /// `core_clock / bus_frequency` is below the 16 clocks of fixed SCL overhead.
    BusTooFast,
    /// The computed divisor does not fit the 8-bit TWBR register.
    DivisorOutOfRange,
    /// A poll bound of zero would time out before the hardware could finish.
    ZeroPollBound,
}

/// Bit-rate register value for prescaler 1: `(core / bus - 16) / 2`.
///
/// # Errors
///
/// Returns [`ConfigurationError::BusTooFast`] when the bus frequency is zero
/// or too close to the core clock, and [`ConfigurationError::DivisorOutOfRange`]
/// when the divisor exceeds 255.
pub const fn bit_rate_divisor(
    core_clock: HertzU32,
    bus: HertzU32,
) -> Result<u8, ConfigurationError> {
    let bus_hz = bus.to_Hz();
    if bus_hz == 0 {
        return Err(ConfigurationError::BusTooFast);
    }
    let ratio = core_clock.to_Hz() / bus_hz;
    if ratio < 16 {
        return Err(ConfigurationError::BusTooFast);
    }
    let divisor = (ratio - 16) / 2;
    if divisor > u8::MAX as u32 {
        return Err(ConfigurationError::DivisorOutOfRange);
    }
    Ok(divisor as u8)
}

/// Bounds of the completion poll performed after every triggering write.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PollConfig {
    /// Number of poll intervals to wait for TWINT before reporting a timeout.
    pub max_polls: u8,
    pub poll_interval_us: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_polls: 20,
            poll_interval_us: 50,
        }
    }
}

/// Parameters of the SCL toggling used to free a wedged bus.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RecoveryConfig {
    /// Clock pulses to issue before giving up; nine covers a full byte plus ACK.
    pub max_clocks: u8,
    pub half_period_ms: u32,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_clocks: 9,
            half_period_ms: 1,
        }
    }
}

/// Validated bus configuration. Build it with [`TwiConfigBuilder`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TwiConfig {
    core_clock: HertzU32,
    speed: I2cSpeed,
    bit_rate: u8,
    pub poll: PollConfig,
    pub recovery: RecoveryConfig,
}

impl Default for TwiConfig {
    fn default() -> Self {
        // 16 MHz / 100 kHz
        Self {
            core_clock: DEFAULT_CORE_CLOCK,
            speed: I2cSpeed::Standard,
            bit_rate: 72,
            poll: PollConfig::default(),
            recovery: RecoveryConfig::default(),
        }
    }
}

impl TwiConfig {
    #[must_use]
    pub fn core_clock(&self) -> HertzU32 {
        self.core_clock
    }

    #[must_use]
    pub fn speed(&self) -> I2cSpeed {
        self.speed
    }

    /// Value written to TWBR by `init`.
    #[must_use]
    pub fn bit_rate(&self) -> u8 {
        self.bit_rate
    }

    /// SCL frequency actually produced by [`Self::bit_rate`]: `core / (16 + 2 * TWBR)`.
    #[must_use]
    pub fn scl_frequency(&self) -> HertzU32 {
        let period = 16 + 2 * u32::from(self.bit_rate);
        HertzU32::from_raw(self.core_clock.to_Hz() / period)
    }

    /// Switch to another bus speed, keeping the core clock.
    ///
    /// # Errors
    ///
    /// Propagates [`bit_rate_divisor`] failures; the configuration is left
    /// untouched in that case.
    pub fn set_speed(&mut self, speed: I2cSpeed) -> Result<(), ConfigurationError> {
        self.bit_rate = bit_rate_divisor(self.core_clock, speed.frequency())?;
        self.speed = speed;
        Ok(())
    }
}

pub struct TwiConfigBuilder {
    core_clock: HertzU32,
    speed: I2cSpeed,
    poll: PollConfig,
    recovery: RecoveryConfig,
}

impl Default for TwiConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TwiConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            core_clock: DEFAULT_CORE_CLOCK,
            speed: I2cSpeed::Standard,
            poll: PollConfig::default(),
            recovery: RecoveryConfig::default(),
        }
    }
    #[must_use]
    pub fn core_clock(mut self, core_clock: HertzU32) -> Self {
        self.core_clock = core_clock;
        self
    }
    #[must_use]
    pub fn speed(mut self, speed: I2cSpeed) -> Self {
        self.speed = speed;
        self
    }
    #[must_use]
    pub fn poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }
    #[must_use]
    pub fn recovery(mut self, recovery: RecoveryConfig) -> Self {
        self.recovery = recovery;
        self
    }

    /// # Errors
    ///
    /// Fails when the divisor cannot be represented or the poll bound is zero.
    pub fn build(self) -> Result<TwiConfig, ConfigurationError> {
        if self.poll.max_polls == 0 {
            return Err(ConfigurationError::ZeroPollBound);
        }
        let bit_rate = bit_rate_divisor(self.core_clock, self.speed.frequency())?;
        Ok(TwiConfig {
            core_clock: self.core_clock,
            speed: self.speed,
            bit_rate,
            poll: self.poll,
            recovery: self.recovery,
        })
    }
}
