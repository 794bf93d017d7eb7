//! SCD30 CO2 / temperature / humidity sensor
//!
//! The SCD30 speaks 16-bit commands and answers in 3-byte groups: two data bytes
//! followed by a CRC-8 (polynomial 0x31, init 0xFF). A measurement is six groups
//! carrying three big-endian `f32` values split across two words each.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use serde::Serialize;

use super::bus::BusError;

const CMD_START_CONTINUOUS: [u8; 2] = [0x00, 0x10];
const CMD_DATA_READY: [u8; 2] = [0x02, 0x02];
const CMD_READ_MEASUREMENT: [u8; 2] = [0x03, 0x00];

/// Ambient pressure argument of the start command, 0 disables compensation
const NO_PRESSURE_COMPENSATION: [u8; 2] = [0x00, 0x00];

/// Time the sensor needs between a command and the response (ms)
const RESPONSE_WAIT_MS: u32 = 5;
/// Start-up time after enabling continuous measurement (ms)
const START_WAIT_MS: u32 = 40;

const CRC_POLYNOMIAL: u8 = 0x31;
const CRC_INIT: u8 = 0xFF;

/// One environment sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct EnvReading {
    /// CO2 concentration (ppm)
    pub co2: f32,
    /// Temperature (°C)
    pub temperature: f32,
    /// Relative humidity (%)
    pub humidity: f32,
}

/// Sensirion CRC-8 over a data word
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = CRC_INIT;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC_POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Unpack the 18-byte measurement frame, `None` if any CRC fails
pub fn unpack_measurement(frame: &[u8; 18]) -> Option<EnvReading> {
    let valid = frame.chunks_exact(3).all(|group| crc8(&group[..2]) == group[2]);
    if !valid {
        return None;
    }
    let value = |at: usize| {
        f32::from_be_bytes([frame[at], frame[at + 1], frame[at + 3], frame[at + 4]])
    };
    Some(EnvReading {
        co2: value(0),
        temperature: value(6),
        humidity: value(12),
    })
}

/// SCD30 on the shared bus
pub struct Scd30<I, D> {
    i2c: I,
    delay: D,
    address: u8,
}

impl<I: I2c, D: DelayNs> Scd30<I, D> {
    pub fn new(i2c: I, delay: D, address: u8) -> Self {
        Self { i2c, delay, address }
    }

    /// Enable continuous measurement without pressure compensation
    pub async fn start_continuous(&mut self) -> Result<(), BusError> {
        let [c0, c1] = CMD_START_CONTINUOUS;
        let [a0, a1] = NO_PRESSURE_COMPENSATION;
        let crc = crc8(&NO_PRESSURE_COMPENSATION);
        self.i2c
            .write(self.address, &[c0, c1, a0, a1, crc])
            .await
            .map_err(BusError::at(self.address))?;
        self.delay.delay_ms(START_WAIT_MS).await;
        log_info!("SCD30 continuous measurement started");
        Ok(())
    }

    /// Whether a new measurement is waiting
    pub async fn data_ready(&mut self) -> Result<bool, BusError> {
        let mut buf = [0u8; 3];
        self.command_then_read(CMD_DATA_READY, &mut buf).await?;
        Ok(crc8(&buf[..2]) == buf[2] && u16::from_be_bytes([buf[0], buf[1]]) == 1)
    }

    /// Fetch the pending measurement, `Ok(None)` if its CRC does not check out
    pub async fn read_measurement(&mut self) -> Result<Option<EnvReading>, BusError> {
        let mut frame = [0u8; 18];
        self.command_then_read(CMD_READ_MEASUREMENT, &mut frame).await?;
        let reading = unpack_measurement(&frame);
        if reading.is_none() {
            log_warn!("SCD30 measurement failed CRC");
        }
        Ok(reading)
    }

    /// Poll data-ready and read, folding bus failures and stale data into `None`
    pub async fn read(&mut self) -> Option<EnvReading> {
        let result = match self.data_ready().await {
            Ok(true) => self.read_measurement().await,
            Ok(false) => Ok(None),
            Err(e) => Err(e),
        };
        match result {
            Ok(reading) => reading,
            Err(e) => {
                log_warn!("SCD30 {} read failed: {:?}", e.address, e.kind);
                None
            }
        }
    }

    async fn command_then_read(&mut self, command: [u8; 2], buf: &mut [u8]) -> Result<(), BusError> {
        self.i2c
            .write(self.address, &command)
            .await
            .map_err(BusError::at(self.address))?;
        self.delay.delay_ms(RESPONSE_WAIT_MS).await;
        self.i2c
            .read(self.address, buf)
            .await
            .map_err(BusError::at(self.address))
    }
}
