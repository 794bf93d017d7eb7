//! PCF8574 8-bit I/O expander
//!
//! The PCF8574 has no registers: writing one byte sets the eight quasi-bidirectional
//! outputs, reading one byte samples the pins. A pin used as an input must be
//! written high first. The driver keeps a shadow of the last written byte so single
//! bits can be changed without a read-modify-write on the bus.
//!
//! The robot uses three of them: two carry motor direction bits and one drives the
//! ultrasonic trigger and samples its echo.

use embedded_hal_async::i2c::I2c;

use super::bus::BusError;

/// Output byte after power-on and after a reset: every line released high
pub const RELEASED: u8 = 0xFF;

/// One PCF8574 on the shared bus
pub struct Pcf8574<I> {
    i2c: I,
    address: u8,
    output: u8,
}

impl<I: I2c> Pcf8574<I> {
    /// Create a driver, assuming the chip is in its power-on state
    pub fn new(i2c: I, address: u8) -> Self {
        Self {
            i2c,
            address,
            output: RELEASED,
        }
    }

    /// Bus address of this chip
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Last byte written to the outputs
    pub fn output(&self) -> u8 {
        self.output
    }

    /// Write the whole output byte
    pub async fn write(&mut self, value: u8) -> Result<(), BusError> {
        self.i2c.write(self.address, &[value]).await.map_err(BusError::at(self.address))?;
        self.output = value;
        Ok(())
    }

    /// Sample the eight pins
    pub async fn read(&mut self) -> Result<u8, BusError> {
        let mut buf = [0u8; 1];
        self.i2c.read(self.address, &mut buf).await.map_err(BusError::at(self.address))?;
        Ok(buf[0])
    }

    /// Drive a single output pin, leaving the other seven as last written
    pub async fn set_pin(&mut self, pin: u8, high: bool) -> Result<(), BusError> {
        if pin > 7 {
            return Ok(());
        }
        let value = if high {
            self.output | (1 << pin)
        } else {
            self.output & !(1 << pin)
        };
        self.write(value).await
    }

    /// Whether `pin` reads high
    pub async fn read_pin(&mut self, pin: u8) -> Result<bool, BusError> {
        Ok(self.read().await? & (1 << pin) != 0)
    }
}
