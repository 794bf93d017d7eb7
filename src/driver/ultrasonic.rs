//! Ultrasonic ranging through a PCF8574
//!
//! The HC-SR04 style sensor hangs off the ranging expander rather than MCU pins:
//! its trigger is one output bit and its echo is one input bit. A measurement
//! drives the trigger low, pulses it high for at least 10 µs, then times the echo
//! pulse by re-reading the expander byte.
//!
//! # Timing
//! Each echo poll is a full I2C read, and between polls the driver yields through
//! `DelayNs` so other tasks keep running. The echo width is therefore quantised to
//! the poll yield (about 17 cm at 1 ms). A yield is never longer than the time left
//! in the edge budget, so a genuine echo is always sampled once more at the deadline
//! instead of being pushed past it.
//!
//! Timeouts are not errors for the caller: [`Ultrasonic::measure`] returns
//! [`DistanceReading::Invalid`], which means "no update this cycle", never zero.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use super::bus::{BusError, Clock};
use super::pcf8574::Pcf8574;
use crate::config::UltrasonicConfig;

/// Result of one ranging cycle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub enum DistanceReading {
    /// Distance to the nearest reflector
    Cm(f32),
    /// No usable echo this cycle
    Invalid,
}

impl DistanceReading {
    pub fn cm(&self) -> Option<f32> {
        match self {
            DistanceReading::Cm(cm) => Some(*cm),
            DistanceReading::Invalid => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, DistanceReading::Cm(_))
    }
}

/// Why a ranging cycle produced no distance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub enum MeasureError {
    /// Echo never went high
    EchoStartTimeout,
    /// Echo went high but never came back low
    EchoEndTimeout,
    /// Expander did not answer
    Bus(BusError),
}

impl From<BusError> for MeasureError {
    fn from(e: BusError) -> Self {
        MeasureError::Bus(e)
    }
}

/// Round-trip echo width (µs) to one-way distance (cm)
pub fn echo_to_cm(echo_us: u64) -> f32 {
    echo_us as f32 * UltrasonicConfig::SPEED_OF_SOUND_CM_PER_US / 2.0
}

/// Ultrasonic sensor behind a PCF8574
pub struct Ultrasonic<I, D, C> {
    expander: Pcf8574<I>,
    delay: D,
    clock: C,
    config: UltrasonicConfig,
}

impl<I: I2c, D: DelayNs, C: Clock> Ultrasonic<I, D, C> {
    pub fn new(expander: Pcf8574<I>, delay: D, clock: C, config: UltrasonicConfig) -> Self {
        Self {
            expander,
            delay,
            clock,
            config,
        }
    }

    /// One ranging cycle, folding every failure into [`DistanceReading::Invalid`]
    pub async fn measure(&mut self) -> DistanceReading {
        match self.try_measure().await {
            Ok(cm) => DistanceReading::Cm(cm),
            Err(MeasureError::Bus(e)) => {
                log_warn!("Ranging expander {} unreachable: {:?}", e.address, e.kind);
                DistanceReading::Invalid
            }
            Err(e) => {
                log_debug!("No echo: {:?}", e);
                DistanceReading::Invalid
            }
        }
    }

    /// One ranging cycle with the reason for a missing distance
    pub async fn try_measure(&mut self) -> Result<f32, MeasureError> {
        let trigger = self.config.trigger_bit;

        self.expander.set_pin(trigger, false).await?;
        self.delay.delay_us(self.config.settle_us).await;
        self.expander.set_pin(trigger, true).await?;
        self.delay.delay_us(self.config.trigger_pulse_us).await;
        self.expander.set_pin(trigger, false).await?;

        let triggered = self.clock.now_us();
        let rise = self
            .wait_for_echo(true, triggered)
            .await?
            .ok_or(MeasureError::EchoStartTimeout)?;
        let fall = self
            .wait_for_echo(false, rise)
            .await?
            .ok_or(MeasureError::EchoEndTimeout)?;

        Ok(echo_to_cm(fall - rise))
    }

    /// Poll the echo bit until it reads `level`, giving up `edge_timeout_us` after `since`
    ///
    /// Returns the timestamp of the first sample at `level`.
    async fn wait_for_echo(&mut self, level: bool, since: u64) -> Result<Option<u64>, BusError> {
        let timeout = u64::from(self.config.edge_timeout_us);
        loop {
            let sample = self.expander.read_pin(self.config.echo_bit).await?;
            let now = self.clock.now_us();
            if sample == level {
                return Ok(Some(now));
            }

            let elapsed = now.saturating_sub(since);
            if elapsed >= timeout {
                return Ok(None);
            }
            let pause = u64::from(self.config.poll_yield_us).min(timeout - elapsed);
            self.delay.delay_us(pause as u32).await;
        }
    }
}
